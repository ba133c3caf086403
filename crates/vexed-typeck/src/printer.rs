//! Single-line rendering of typed tree nodes.
//!
//! Used for trace output and for the text form of partially reduced
//! graphs. Scoped wrappers are transparent; instances render as their
//! handle unless the caller supplies a label (the runtime labels scalar
//! instances with their value).

use vexed_common::InstanceId;

use crate::registry::TypeRegistry;
use crate::tst::{Block, Expr, Literal, Stmt};
use crate::visit::Visit;

pub struct Printer<'a> {
    registry: &'a TypeRegistry,
    label: Option<&'a dyn Fn(InstanceId) -> Option<String>>,
    out: String,
}

impl<'a> Printer<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Printer {
            registry,
            label: None,
            out: String::new(),
        }
    }

    /// Render instances through `label`, falling back to the handle.
    pub fn with_labels(mut self, label: &'a dyn Fn(InstanceId) -> Option<String>) -> Self {
        self.label = Some(label);
        self
    }

    pub fn print(mut self, expr: &Expr) -> String {
        self.visit_expr(expr);
        self.out
    }

    fn list(&mut self, exprs: &[Expr]) {
        for (i, e) in exprs.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.visit_expr(e);
        }
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        self.out.push('{');
        for s in stmts {
            self.out.push(' ');
            self.visit_stmt(s);
        }
        self.out.push_str(" }");
    }

    fn block(&mut self, block: &Block) {
        self.stmts(&block.stmts);
    }
}

impl Visit for Printer<'_> {
    fn visit_expr(&mut self, expr: &Expr) -> bool {
        match expr {
            Expr::Literal(Literal::Int(n)) => self.out.push_str(&n.to_string()),
            Expr::Literal(Literal::Float(x)) => self.out.push_str(&format!("{:?}", x)),
            Expr::Literal(Literal::String(s)) => self.out.push_str(&format!("{:?}", s)),
            Expr::Literal(Literal::Bool(b)) => self.out.push_str(&b.to_string()),
            Expr::Literal(Literal::Array { elements, .. }) => {
                self.out.push('[');
                self.list(elements);
                self.out.push(']');
            }
            Expr::Instance(id) => {
                let text = self.label.and_then(|l| l(*id)).unwrap_or_else(|| id.to_string());
                self.out.push_str(&text);
            }
            Expr::This { .. } => self.out.push_str("this"),
            Expr::Param { name, .. } | Expr::Variable { name, .. } => self.out.push_str(name),
            Expr::Member { object, name, .. } => {
                self.visit_expr(object);
                self.out.push('.');
                self.out.push_str(name);
            }
            Expr::Index { object, index, .. } => {
                self.visit_expr(object);
                self.out.push('[');
                self.visit_expr(index);
                self.out.push(']');
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                self.out.push('(');
                self.visit_expr(lhs);
                self.out.push_str(&format!(" {} ", op.symbol()));
                self.visit_expr(rhs);
                self.out.push(')');
            }
            Expr::Unary { op, operand, .. } => {
                self.out.push_str(op.symbol());
                self.visit_expr(operand);
            }
            Expr::New { class, args } => {
                self.out.push_str("new ");
                self.out.push_str(self.registry.name(*class));
                self.out.push('(');
                self.list(args);
                self.out.push(')');
            }
            Expr::Call { callee, args, .. } => {
                self.visit_expr(callee);
                self.out.push('(');
                self.list(args);
                self.out.push(')');
            }
            Expr::NativeMember { operand, hook, .. } => {
                self.visit_expr(operand);
                self.out.push_str(&format!(".<{}>", hook));
            }
            Expr::Promise { id, .. } => self.out.push_str(&format!("<{}>", id)),
            Expr::Missing { .. } => self.out.push_str("missing"),
            Expr::Scoped { expr, .. } => {
                self.visit_expr(expr);
            }
            Expr::Block(block) => self.block(block),
            Expr::UnboundFunction(m) => {
                let method = self.registry.method(*m);
                self.out.push_str(&format!("{}.{}", self.registry.name(m.owner), method.name));
            }
            Expr::Function { method, receiver } => {
                let registry = self.registry;
                let name = &registry.method(*method).name;
                let receiver = Expr::Instance(*receiver);
                self.visit_expr(&receiver);
                self.out.push('.');
                self.out.push_str(name);
            }
        }
        false
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.out.push_str("if (");
                self.visit_expr(cond);
                self.out.push_str(") ");
                self.stmts(then_branch);
                if !else_branch.is_empty() {
                    self.out.push_str(" else ");
                    self.stmts(else_branch);
                }
            }
            Stmt::Return(expr) => {
                self.out.push_str("return ");
                self.visit_expr(expr);
                self.out.push(';');
            }
            Stmt::LocalDecl { name, ty, init } => {
                self.out.push_str(&format!("let {}: {} = ", name, self.registry.name(*ty)));
                self.visit_expr(init);
                self.out.push(';');
            }
            Stmt::LocalAssign { name, value } => {
                self.out.push_str(&format!("{} = ", name));
                self.visit_expr(value);
                self.out.push(';');
            }
        }
    }
}

pub fn print_expr(registry: &TypeRegistry, expr: &Expr) -> String {
    Printer::new(registry).print(expr)
}
