//! Fatal evaluation errors.
//!
//! Script-level type errors are reported during lowering (see
//! `vexed_typeck::TypeError`). Everything here is a consistency violation
//! the reducer cannot recover from and aborts evaluation outright. The one
//! exception in spirit is [`EvalError::PromiseRejected`]: it is raised only
//! when the node owning the rejected promise is next visited.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unknown binding `{name}`")]
    UnknownBinding { name: String },

    #[error("`this` used outside of an instance scope")]
    MissingReceiver,

    #[error("operator `{op}` applied to `{lhs}` and `{rhs}`")]
    OperandTypeMismatch { op: String, lhs: String, rhs: String },

    #[error("type `{ty}` does not support operator `{op}`")]
    UnsupportedOperator { op: String, ty: String },

    #[error("type `{ty}` cannot be indexed")]
    UnsupportedIndex { ty: String },

    #[error("type `{ty}` has no property `{name}`")]
    UnknownProperty { ty: String, name: String },

    #[error("instance of `{ty}` has no constructor scope for `{owner}`")]
    MissingMethodScope { ty: String, owner: String },

    #[error("method `{method}` has no body and no native implementation")]
    MissingMethodBody { method: String },

    #[error("no host hook registered as `{hook}`")]
    UnknownHook { hook: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow in `{op}`")]
    Overflow { op: String },

    #[error("evaluation did not converge after {sweeps} sweeps")]
    NonTermination { sweeps: usize },

    #[error("promise rejected: {message}")]
    PromiseRejected { message: String },

    #[error("`{path}` did not reduce to a value")]
    Unreduced { path: String },

    #[error("`{path}` refers back to an enclosing instance")]
    Cycle { path: String },

    #[error("instance of `{ty}` does not carry a {expected} payload")]
    InvalidPayload { ty: String, expected: &'static str },
}
