//! Arena storage for scopes, instances and promises.
//!
//! The reduced graph is full of sharing: every expression closing over a
//! scope refers to the same scope, and an instance is referenced from every
//! slot that holds it. Both live here and are addressed by the copyable
//! handles from `vexed_common`, so rewriting a binding once is visible at
//! every site that refers to it.

use std::future::Future;
use std::pin::Pin;

use vexed_common::{InstanceId, PromiseId, ScopeId};
use vexed_typeck::{Expr, TypeId};

use crate::value::{HostValue, NativeValue};

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub expr: Expr,
    pub ty: TypeId,
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub receiver: Option<InstanceId>,
    pub bindings: Vec<Binding>,
    /// Generic arguments bound by the call that created this scope.
    pub type_args: Vec<(TypeId, TypeId)>,
}

#[derive(Debug, Clone)]
pub struct PropertySlot {
    pub name: String,
    /// The ancestor that declares the property.
    pub declaring: TypeId,
    pub ty: TypeId,
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub ty: TypeId,
    pub payload: NativeValue,
    /// Each ancestor's constructor scope, root first.
    pub scopes: Vec<(TypeId, ScopeId)>,
    pub sealed: bool,
    /// Ancestor properties first, then declaration order.
    pub properties: Vec<PropertySlot>,
}

impl Instance {
    pub fn property(&self, name: &str) -> Option<&PropertySlot> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn ctor_scope(&self, ty: TypeId) -> Option<ScopeId> {
        self.scopes.iter().find(|(t, _)| *t == ty).map(|(_, s)| *s)
    }
}

pub type HostFuture = Pin<Box<dyn Future<Output = Result<HostValue, String>> + Send>>;

pub enum PromiseState {
    /// Created by a plugin; not yet handed to a batch.
    Registered { ty: TypeId, future: HostFuture },
    /// Being awaited by the current batch.
    InFlight { ty: TypeId },
    /// The batch finished; the result has not been read yet.
    Settled(Result<HostValue, String>),
    /// The result, converted to a tree node once and shared by every
    /// reference to the promise.
    Resolved(Expr),
    Rejected(String),
}

impl PromiseState {
    pub fn is_pending(&self) -> bool {
        matches!(self, PromiseState::Registered { .. })
    }
}

#[derive(Default)]
pub struct Heap {
    scopes: Vec<Scope>,
    instances: Vec<Instance>,
    promises: Vec<PromiseState>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Scopes ──────────────────────────────────────────────────────────

    pub fn alloc_scope(&mut self, scope: Scope) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(scope);
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// The scopes from `id` up to the root of its chain.
    pub fn chain(&self, id: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(id), move |s| self.scope(*s).parent)
    }

    /// The nearest binding named `name`, searching outward from `id`.
    pub fn lookup(&self, id: ScopeId, name: &str) -> Option<(ScopeId, usize)> {
        self.chain(id).find_map(|s| {
            self.scope(s)
                .bindings
                .iter()
                .position(|b| b.name == name)
                .map(|i| (s, i))
        })
    }

    pub fn receiver(&self, id: ScopeId) -> Option<InstanceId> {
        self.chain(id).find_map(|s| self.scope(s).receiver)
    }

    /// The argument bound to generic parameter `param` by the nearest call.
    pub fn type_arg(&self, id: ScopeId, param: TypeId) -> Option<TypeId> {
        self.chain(id).find_map(|s| {
            self.scope(s)
                .type_args
                .iter()
                .find(|(p, _)| *p == param)
                .map(|(_, t)| *t)
        })
    }

    /// A scope is reduced when every binding in it and in its ancestors
    /// holds a terminal node.
    pub fn is_scope_reduced(&self, id: ScopeId) -> bool {
        self.chain(id)
            .all(|s| self.scope(s).bindings.iter().all(|b| b.expr.is_terminal()))
    }

    // ── Instances ───────────────────────────────────────────────────────

    pub fn alloc_instance(&mut self, instance: Instance) -> InstanceId {
        let id = InstanceId(self.instances.len() as u32);
        self.instances.push(instance);
        id
    }

    pub fn instance(&self, id: InstanceId) -> &Instance {
        &self.instances[id.index()]
    }

    pub fn instance_mut(&mut self, id: InstanceId) -> &mut Instance {
        &mut self.instances[id.index()]
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn payload(&self, id: InstanceId) -> &NativeValue {
        &self.instance(id).payload
    }

    // ── Promises ────────────────────────────────────────────────────────

    pub fn alloc_promise(&mut self, state: PromiseState) -> PromiseId {
        let id = PromiseId(self.promises.len() as u32);
        self.promises.push(state);
        id
    }

    pub fn promise(&self, id: PromiseId) -> &PromiseState {
        &self.promises[id.index()]
    }

    pub fn promise_mut(&mut self, id: PromiseId) -> &mut PromiseState {
        &mut self.promises[id.index()]
    }
}
