//! The typed syntax tree.
//!
//! Lowering produces these nodes from the parser's AST; the runtime then
//! rewrites them in place, sweep after sweep, until every property of the
//! root instance is a terminal node. The tag set is closed: every traversal
//! in the workspace is an exhaustive match over [`Expr`] and [`Stmt`] (see
//! [`crate::visit`]).

use std::fmt;

use vexed_common::{HookId, InstanceId, PromiseId, ScopeId};

use crate::ty::{MethodRef, TypeId};

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    /// An array literal. `ty` is the array type, which may mention generic
    /// placeholders that are bound by the enclosing call.
    Array { elements: Vec<Expr>, ty: TypeId },
}

impl Literal {
    pub fn ty(&self) -> TypeId {
        match self {
            Literal::Int(_) => TypeId::INT,
            Literal::Float(_) => TypeId::FLOAT,
            Literal::String(_) => TypeId::STRING,
            Literal::Bool(_) => TypeId::BOOL,
            Literal::Array { ty, .. } => *ty,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    /// Reflects the operand's static type; never evaluates the operand.
    TypeOf,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::TypeOf => "typeof ",
        }
    }
}

/// An operator as seen by a type's operator hook.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Binary(BinaryOp),
    Unary(UnaryOp),
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Binary(op) => f.write_str(op.symbol()),
            Operator::Unary(op) => f.write_str(op.symbol().trim_end()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// A reference to a runtime instance. Terminal.
    Instance(InstanceId),
    This {
        ty: TypeId,
    },
    /// A constructor or method parameter.
    Param {
        name: String,
        ty: TypeId,
    },
    /// A local variable or method name in scope.
    Variable {
        name: String,
        ty: TypeId,
    },
    Member {
        object: Box<Expr>,
        name: String,
        ty: TypeId,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        ty: TypeId,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        ty: TypeId,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        ty: TypeId,
    },
    New {
        class: TypeId,
        args: Vec<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        /// Generic parameter → concrete type, as inferred at the call site.
        type_args: Vec<(TypeId, TypeId)>,
        ty: TypeId,
    },
    /// Runs a host hook once `operand` has reduced to an instance.
    NativeMember {
        operand: Box<Expr>,
        hook: HookId,
        ty: TypeId,
    },
    /// The eventual result of an asynchronous host operation.
    Promise {
        id: PromiseId,
        ty: TypeId,
    },
    /// Confirmed absence of a value. Terminal, and distinct from a pending
    /// promise.
    Missing {
        ty: TypeId,
    },
    /// Binds `expr` to a runtime scope.
    Scoped {
        scope: ScopeId,
        expr: Box<Expr>,
    },
    /// A method body.
    Block(Block),
    /// A method in its as-declared form, not yet attached to a receiver.
    UnboundFunction(MethodRef),
    /// A method attached to its receiver. Terminal.
    Function {
        method: MethodRef,
        receiver: InstanceId,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub ret: TypeId,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
    },
    Return(Expr),
    LocalDecl {
        name: String,
        ty: TypeId,
        init: Expr,
    },
    LocalAssign {
        name: String,
        value: Expr,
    },
}

impl Expr {
    pub fn int(value: i64) -> Expr {
        Expr::Literal(Literal::Int(value))
    }

    pub fn float(value: f64) -> Expr {
        Expr::Literal(Literal::Float(value))
    }

    pub fn string(value: impl Into<String>) -> Expr {
        Expr::Literal(Literal::String(value.into()))
    }

    pub fn bool(value: bool) -> Expr {
        Expr::Literal(Literal::Bool(value))
    }

    pub fn array(elements: Vec<Expr>, ty: TypeId) -> Expr {
        Expr::Literal(Literal::Array { elements, ty })
    }

    pub fn this(ty: TypeId) -> Expr {
        Expr::This { ty }
    }

    pub fn param(name: impl Into<String>, ty: TypeId) -> Expr {
        Expr::Param {
            name: name.into(),
            ty,
        }
    }

    pub fn var(name: impl Into<String>, ty: TypeId) -> Expr {
        Expr::Variable {
            name: name.into(),
            ty,
        }
    }

    pub fn member(object: Expr, name: impl Into<String>, ty: TypeId) -> Expr {
        Expr::Member {
            object: Box::new(object),
            name: name.into(),
            ty,
        }
    }

    pub fn index(object: Expr, index: Expr, ty: TypeId) -> Expr {
        Expr::Index {
            object: Box::new(object),
            index: Box::new(index),
            ty,
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, ty: TypeId) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty,
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr, ty: TypeId) -> Expr {
        Expr::Unary {
            op,
            operand: Box::new(operand),
            ty,
        }
    }

    pub fn new_instance(class: TypeId, args: Vec<Expr>) -> Expr {
        Expr::New { class, args }
    }

    pub fn call(callee: Expr, args: Vec<Expr>, ty: TypeId) -> Expr {
        Expr::Call {
            callee: Box::new(callee),
            args,
            type_args: Vec::new(),
            ty,
        }
    }

    pub fn scoped(scope: ScopeId, expr: Expr) -> Expr {
        Expr::Scoped {
            scope,
            expr: Box::new(expr),
        }
    }

    pub fn missing(ty: TypeId) -> Expr {
        Expr::Missing { ty }
    }

    /// Whether no further rewrite can change this node's value: an instance,
    /// a confirmed absence, or a function reference.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Expr::Instance(_)
                | Expr::Missing { .. }
                | Expr::Function { .. }
                | Expr::UnboundFunction(_)
        )
    }

    pub fn as_instance(&self) -> Option<InstanceId> {
        match self {
            Expr::Instance(id) => Some(*id),
            _ => None,
        }
    }

    /// The type recorded on the node by lowering, if the node carries one.
    ///
    /// Instances, scoped wrappers and function references need runtime or
    /// registry context to type and return `None` here.
    pub fn declared_ty(&self) -> Option<TypeId> {
        match self {
            Expr::Literal(lit) => Some(lit.ty()),
            Expr::This { ty }
            | Expr::Param { ty, .. }
            | Expr::Variable { ty, .. }
            | Expr::Member { ty, .. }
            | Expr::Index { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Unary { ty, .. }
            | Expr::Call { ty, .. }
            | Expr::NativeMember { ty, .. }
            | Expr::Promise { ty, .. }
            | Expr::Missing { ty } => Some(*ty),
            Expr::New { class, .. } => Some(*class),
            Expr::Block(block) => Some(block.ret),
            Expr::Scoped { expr, .. } => expr.declared_ty(),
            Expr::Instance(_) | Expr::UnboundFunction(_) | Expr::Function { .. } => None,
        }
    }
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, ret: TypeId) -> Self {
        Block { stmts, ret }
    }

    /// A body consisting of a single `return expr`.
    pub fn returning(expr: Expr, ret: TypeId) -> Self {
        Block {
            stmts: vec![Stmt::Return(expr)],
            ret,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_nodes() {
        assert!(Expr::Instance(InstanceId(0)).is_terminal());
        assert!(Expr::missing(TypeId::INT).is_terminal());
        assert!(!Expr::int(1).is_terminal());
        assert!(!Expr::this(TypeId::ANY).is_terminal());
        assert!(!Expr::Promise { id: PromiseId(0), ty: TypeId::INT }.is_terminal());
    }

    #[test]
    fn declared_types_look_through_scoped() {
        let e = Expr::scoped(ScopeId(1), Expr::string("hi"));
        assert_eq!(e.declared_ty(), Some(TypeId::STRING));
        let call = Expr::call(Expr::this(TypeId::ANY), vec![], TypeId::BOOL);
        assert_eq!(call.declared_ty(), Some(TypeId::BOOL));
        assert_eq!(Expr::Instance(InstanceId(2)).declared_ty(), None);
    }

    #[test]
    fn operator_display() {
        assert_eq!(Operator::Binary(BinaryOp::Le).to_string(), "<=");
        assert_eq!(Operator::Unary(UnaryOp::TypeOf).to_string(), "typeof");
    }
}
