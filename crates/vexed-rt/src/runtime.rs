use std::future::Future;

use vexed_common::InstanceId;
use vexed_typeck::{Expr, TypeId, TypeRegistry};

use crate::heap::{Heap, Instance, PromiseState};
use crate::native::Natives;
use crate::value::{HostValue, NativeValue};

/// Everything a reduction step may touch: the types, the heap and the
/// registered plugins. The evaluation loop is its only owner.
pub struct Runtime {
    pub registry: TypeRegistry,
    pub heap: Heap,
    pub natives: Natives,
}

impl Runtime {
    pub fn new(registry: TypeRegistry) -> Self {
        Self::with_natives(registry, Natives::with_builtins())
    }

    pub fn with_natives(registry: TypeRegistry, natives: Natives) -> Self {
        Runtime {
            registry,
            heap: Heap::new(),
            natives,
        }
    }

    /// Allocate a memberless instance carrying `payload`. Scalars are born
    /// sealed; arrays seal once their elements reduce.
    pub fn alloc_value(&mut self, ty: TypeId, payload: NativeValue) -> InstanceId {
        let sealed = payload.is_scalar();
        self.heap.alloc_instance(Instance {
            ty,
            payload,
            scopes: Vec::new(),
            sealed,
            properties: Vec::new(),
        })
    }

    /// Turn a host result into a tree node.
    pub fn materialize(&mut self, value: HostValue) -> Expr {
        match value {
            HostValue::Value { ty, payload } => Expr::Instance(self.alloc_value(ty, payload)),
            HostValue::Missing(ty) => Expr::missing(ty),
        }
    }

    /// Register an asynchronous host operation producing a value of type
    /// `ty`. The future is not polled until the evaluator's next promise
    /// batch; the returned node stands in for its result until then.
    pub fn spawn_promise<F>(&mut self, ty: TypeId, future: F) -> Expr
    where
        F: Future<Output = Result<HostValue, String>> + Send + 'static,
    {
        let id = self.heap.alloc_promise(PromiseState::Registered {
            ty,
            future: Box::pin(future),
        });
        Expr::Promise { id, ty }
    }

    pub fn type_name(&self, instance: InstanceId) -> String {
        self.registry
            .name(self.heap.instance(instance).ty)
            .to_string()
    }

    /// Text of a scalar instance, as `toString()` and the printer show it.
    pub fn scalar_text(&self, instance: InstanceId) -> Option<String> {
        match self.heap.payload(instance) {
            NativeValue::Int(n) => Some(n.to_string()),
            NativeValue::Float(x) => Some(x.to_string()),
            NativeValue::String(s) => Some(s.clone()),
            NativeValue::Bool(b) => Some(b.to_string()),
            NativeValue::Type(t) => Some(self.registry.name(*t).to_string()),
            _ => None,
        }
    }
}
