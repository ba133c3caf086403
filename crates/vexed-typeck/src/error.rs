//! Script-level type errors with provenance.
//!
//! These are the diagnostics lowering collects while it builds the typed
//! tree. Each one is paired with a poison type substituted at the failing
//! site, so one malformed declaration yields exactly one `TypeError`.

use std::fmt;

use vexed_common::Location;

/// Where a type constraint came from.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintOrigin {
    /// `name = value` or a local declaration with an annotation.
    Assignment { loc: Location },
    /// Argument `index` (zero-based) of the call at `call`.
    Argument { call: Location, index: usize },
    /// A `return` against the enclosing method's declared type.
    Return { loc: Location },
    /// A property initializer against the property's declared type.
    Initializer { property: String, loc: Location },
}

impl ConstraintOrigin {
    pub fn location(&self) -> &Location {
        match self {
            ConstraintOrigin::Assignment { loc }
            | ConstraintOrigin::Return { loc }
            | ConstraintOrigin::Initializer { loc, .. } => loc,
            ConstraintOrigin::Argument { call, .. } => call,
        }
    }
}

/// A type error recorded during lowering.
///
/// Types are stored by display name rather than id so an error outlives the
/// registry it was produced against.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeError {
    /// A type name that no declaration or built-in provides.
    UnknownType { name: String, loc: Location },
    /// A value's type is not assignable to the slot it flows into.
    Mismatch {
        expected: String,
        found: String,
        origin: ConstraintOrigin,
    },
    ArityMismatch {
        expected: usize,
        found: usize,
        loc: Location,
    },
    NoSuchMember {
        ty: String,
        member: String,
        loc: Location,
    },
    /// An operator applied to operands its type does not support, or to
    /// operands of two different types.
    InvalidOperator {
        op: String,
        lhs: String,
        rhs: Option<String>,
        loc: Location,
    },
    DuplicateType { name: String, loc: Location },
}

impl TypeError {
    pub fn location(&self) -> &Location {
        match self {
            TypeError::Mismatch { origin, .. } => origin.location(),
            TypeError::UnknownType { loc, .. }
            | TypeError::ArityMismatch { loc, .. }
            | TypeError::NoSuchMember { loc, .. }
            | TypeError::InvalidOperator { loc, .. }
            | TypeError::DuplicateType { loc, .. } => loc,
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::UnknownType { name, .. } => {
                write!(f, "unknown type `{}`", name)
            }
            TypeError::Mismatch {
                expected, found, ..
            } => {
                write!(f, "type mismatch: expected `{}`, found `{}`", expected, found)
            }
            TypeError::ArityMismatch {
                expected, found, ..
            } => {
                write!(
                    f,
                    "arity mismatch: expected {} arguments, found {}",
                    expected, found
                )
            }
            TypeError::NoSuchMember { ty, member, .. } => {
                write!(f, "type `{}` has no member `{}`", ty, member)
            }
            TypeError::InvalidOperator {
                op,
                lhs,
                rhs: Some(rhs),
                ..
            } => {
                write!(
                    f,
                    "operator `{}` cannot be applied to `{}` and `{}`",
                    op, lhs, rhs
                )
            }
            TypeError::InvalidOperator { op, lhs, rhs: None, .. } => {
                write!(f, "operator `{}` cannot be applied to `{}`", op, lhs)
            }
            TypeError::DuplicateType { name, .. } => {
                write!(f, "type `{}` is declared more than once", name)
            }
        }
    }
}

impl std::error::Error for TypeError {}
