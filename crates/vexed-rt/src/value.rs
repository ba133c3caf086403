//! Native payloads carried by instances, and values produced by host code.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use vexed_typeck::{Expr, TypeId};

/// The host-side data attached to an instance.
///
/// Scalars carry their value here. Arrays keep their elements as tree nodes
/// so the reducer can rewrite them in place. Plugins store arbitrary state
/// (an opened client, a cached derived value) in `Host`.
#[derive(Clone, Default)]
pub enum NativeValue {
    #[default]
    None,
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Array(Vec<Expr>),
    /// A reflected static type (the payload of `Type` instances).
    Type(TypeId),
    Host(Arc<dyn Any + Send + Sync>),
}

impl NativeValue {
    /// Scalars never change after allocation and are created sealed.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            NativeValue::Int(_)
                | NativeValue::Float(_)
                | NativeValue::String(_)
                | NativeValue::Bool(_)
                | NativeValue::Type(_)
        )
    }

    pub fn as_host<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            NativeValue::Host(h) => h.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::None => f.write_str("None"),
            NativeValue::Int(n) => write!(f, "Int({})", n),
            NativeValue::Float(x) => write!(f, "Float({:?})", x),
            NativeValue::String(s) => write!(f, "String({:?})", s),
            NativeValue::Bool(b) => write!(f, "Bool({})", b),
            NativeValue::Array(elements) => write!(f, "Array(len={})", elements.len()),
            NativeValue::Type(t) => write!(f, "Type({})", t.0),
            NativeValue::Host(_) => f.write_str("Host(..)"),
        }
    }
}

/// The result of an asynchronous host operation.
#[derive(Debug, Clone)]
pub enum HostValue {
    /// An instance of `ty` carrying `payload`.
    Value { ty: TypeId, payload: NativeValue },
    /// Confirmed absence of a value of the given type.
    Missing(TypeId),
}

impl HostValue {
    pub fn int(n: i64) -> Self {
        HostValue::Value {
            ty: TypeId::INT,
            payload: NativeValue::Int(n),
        }
    }

    pub fn float(x: f64) -> Self {
        HostValue::Value {
            ty: TypeId::FLOAT,
            payload: NativeValue::Float(x),
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        HostValue::Value {
            ty: TypeId::STRING,
            payload: NativeValue::String(s.into()),
        }
    }

    pub fn bool(b: bool) -> Self {
        HostValue::Value {
            ty: TypeId::BOOL,
            payload: NativeValue::Bool(b),
        }
    }

    /// An array of `ty` whose elements are tree nodes (typically literals).
    pub fn array(ty: TypeId, elements: Vec<Expr>) -> Self {
        HostValue::Value {
            ty,
            payload: NativeValue::Array(elements),
        }
    }
}
