//! Traversals over the typed tree.
//!
//! [`Fold`] is the structural-copy traversal: it consumes a node and returns
//! a structurally equal one unless an implementor overrides a method. The
//! reducer is a `Fold`. [`Visit`] is the read-only counterpart for walkers
//! that only need to look (printing, graph discovery, closedness checks).
//!
//! Both traits dispatch through a single `*_expr` entry point; implementors
//! override that entry, handle the tags they care about, and defer to the
//! matching `walk_*` function for the rest.

use crate::registry::TypeRegistry;
use crate::tst::{Block, Expr, Literal, Stmt};
use crate::ty::TypeId;

pub trait Fold {
    type Error;

    fn fold_expr(&mut self, expr: Expr) -> Result<Expr, Self::Error> {
        walk_expr(self, expr)
    }

    fn fold_stmt(&mut self, stmt: Stmt) -> Result<Stmt, Self::Error> {
        walk_stmt(self, stmt)
    }

    fn fold_block(&mut self, block: Block) -> Result<Block, Self::Error> {
        walk_block(self, block)
    }
}

fn fold_boxed<F: Fold + ?Sized>(f: &mut F, expr: Box<Expr>) -> Result<Box<Expr>, F::Error> {
    Ok(Box::new(f.fold_expr(*expr)?))
}

fn fold_all<F: Fold + ?Sized>(f: &mut F, exprs: Vec<Expr>) -> Result<Vec<Expr>, F::Error> {
    exprs.into_iter().map(|e| f.fold_expr(e)).collect()
}

pub fn walk_expr<F: Fold + ?Sized>(f: &mut F, expr: Expr) -> Result<Expr, F::Error> {
    Ok(match expr {
        Expr::Literal(Literal::Array { elements, ty }) => Expr::Literal(Literal::Array {
            elements: fold_all(f, elements)?,
            ty,
        }),
        Expr::Member { object, name, ty } => Expr::Member {
            object: fold_boxed(f, object)?,
            name,
            ty,
        },
        Expr::Index { object, index, ty } => Expr::Index {
            object: fold_boxed(f, object)?,
            index: fold_boxed(f, index)?,
            ty,
        },
        Expr::Binary { op, lhs, rhs, ty } => Expr::Binary {
            op,
            lhs: fold_boxed(f, lhs)?,
            rhs: fold_boxed(f, rhs)?,
            ty,
        },
        Expr::Unary { op, operand, ty } => Expr::Unary {
            op,
            operand: fold_boxed(f, operand)?,
            ty,
        },
        Expr::New { class, args } => Expr::New {
            class,
            args: fold_all(f, args)?,
        },
        Expr::Call {
            callee,
            args,
            type_args,
            ty,
        } => Expr::Call {
            callee: fold_boxed(f, callee)?,
            args: fold_all(f, args)?,
            type_args,
            ty,
        },
        Expr::NativeMember { operand, hook, ty } => Expr::NativeMember {
            operand: fold_boxed(f, operand)?,
            hook,
            ty,
        },
        Expr::Scoped { scope, expr } => Expr::Scoped {
            scope,
            expr: fold_boxed(f, expr)?,
        },
        Expr::Block(block) => Expr::Block(f.fold_block(block)?),
        leaf @ (Expr::Literal(_)
        | Expr::Instance(_)
        | Expr::This { .. }
        | Expr::Param { .. }
        | Expr::Variable { .. }
        | Expr::Promise { .. }
        | Expr::Missing { .. }
        | Expr::UnboundFunction(_)
        | Expr::Function { .. }) => leaf,
    })
}

pub fn walk_stmt<F: Fold + ?Sized>(f: &mut F, stmt: Stmt) -> Result<Stmt, F::Error> {
    Ok(match stmt {
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => Stmt::If {
            cond: f.fold_expr(cond)?,
            then_branch: then_branch
                .into_iter()
                .map(|s| f.fold_stmt(s))
                .collect::<Result<_, _>>()?,
            else_branch: else_branch
                .into_iter()
                .map(|s| f.fold_stmt(s))
                .collect::<Result<_, _>>()?,
        },
        Stmt::Return(expr) => Stmt::Return(f.fold_expr(expr)?),
        Stmt::LocalDecl { name, ty, init } => Stmt::LocalDecl {
            name,
            ty,
            init: f.fold_expr(init)?,
        },
        Stmt::LocalAssign { name, value } => Stmt::LocalAssign {
            name,
            value: f.fold_expr(value)?,
        },
    })
}

pub fn walk_block<F: Fold + ?Sized>(f: &mut F, block: Block) -> Result<Block, F::Error> {
    Ok(Block {
        stmts: block
            .stmts
            .into_iter()
            .map(|s| f.fold_stmt(s))
            .collect::<Result<_, _>>()?,
        ret: block.ret,
    })
}

/// Read-only traversal. Returning `false` from `visit_expr` stops descent
/// into that node's children.
pub trait Visit {
    fn visit_expr(&mut self, expr: &Expr) -> bool {
        visit_children(self, expr);
        true
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        visit_stmt_children(self, stmt);
    }
}

pub fn visit_children<V: Visit + ?Sized>(v: &mut V, expr: &Expr) {
    match expr {
        Expr::Literal(Literal::Array { elements, .. }) => {
            for e in elements {
                v.visit_expr(e);
            }
        }
        Expr::Member { object, .. } => {
            v.visit_expr(object);
        }
        Expr::Index { object, index, .. } => {
            v.visit_expr(object);
            v.visit_expr(index);
        }
        Expr::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        Expr::Unary { operand, .. } => {
            v.visit_expr(operand);
        }
        Expr::New { args, .. } => {
            for a in args {
                v.visit_expr(a);
            }
        }
        Expr::Call { callee, args, .. } => {
            v.visit_expr(callee);
            for a in args {
                v.visit_expr(a);
            }
        }
        Expr::NativeMember { operand, .. } => {
            v.visit_expr(operand);
        }
        Expr::Scoped { expr, .. } => {
            v.visit_expr(expr);
        }
        Expr::Block(block) => {
            for s in &block.stmts {
                v.visit_stmt(s);
            }
        }
        Expr::Literal(_)
        | Expr::Instance(_)
        | Expr::This { .. }
        | Expr::Param { .. }
        | Expr::Variable { .. }
        | Expr::Promise { .. }
        | Expr::Missing { .. }
        | Expr::UnboundFunction(_)
        | Expr::Function { .. } => {}
    }
}

pub fn visit_stmt_children<V: Visit + ?Sized>(v: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            v.visit_expr(cond);
            for s in then_branch.iter().chain(else_branch) {
                v.visit_stmt(s);
            }
        }
        Stmt::Return(expr) => {
            v.visit_expr(expr);
        }
        Stmt::LocalDecl { init, .. } => {
            v.visit_expr(init);
        }
        Stmt::LocalAssign { value, .. } => {
            v.visit_expr(value);
        }
    }
}

/// Whether `expr` can leave the scope it is bound to.
///
/// A node is closed when nothing in it needs the enclosing scope: no
/// `this`, parameter or variable references, no statement blocks, no array
/// literals (their element type may need generic arguments) and no `typeof`.
/// A node whose declared type or generic call arguments mention a generic
/// parameter stays too, since only the scope knows what the parameter is
/// bound to. Nested `Scoped` nodes carry their own scope and are not
/// inspected.
pub fn is_closed(expr: &Expr, registry: &TypeRegistry) -> bool {
    struct Closed<'r> {
        registry: &'r TypeRegistry,
        closed: bool,
    }

    impl Closed<'_> {
        fn mentions_generic(&self, expr: &Expr) -> bool {
            let generic = |ty: TypeId| self.registry.contains_generic(ty);
            if expr.declared_ty().is_some_and(generic) {
                return true;
            }
            match expr {
                Expr::Call { type_args, .. } => type_args.iter().any(|&(_, arg)| generic(arg)),
                _ => false,
            }
        }
    }

    impl Visit for Closed<'_> {
        fn visit_expr(&mut self, expr: &Expr) -> bool {
            if !self.closed {
                return false;
            }
            match expr {
                Expr::This { .. }
                | Expr::Param { .. }
                | Expr::Variable { .. }
                | Expr::Block(_)
                | Expr::UnboundFunction(_)
                | Expr::Literal(Literal::Array { .. })
                | Expr::Unary {
                    op: crate::tst::UnaryOp::TypeOf,
                    ..
                } => {
                    self.closed = false;
                    false
                }
                Expr::Scoped { .. } => false,
                _ if self.mentions_generic(expr) => {
                    self.closed = false;
                    false
                }
                _ => {
                    visit_children(self, expr);
                    true
                }
            }
        }
    }

    let mut v = Closed {
        registry,
        closed: true,
    };
    v.visit_expr(expr);
    v.closed
}
