//! Instance construction.
//!
//! `new C(args)` allocates the instance and one constructor scope per class
//! on C's ancestor chain. Each scope binds that class's parameters and the
//! methods visible from it, with the instance as receiver. A parent's
//! constructor arguments are the child's `extends` expressions, evaluated
//! in the child's scope. Nothing is evaluated here: parameters and property
//! initializers are stored as scoped nodes for the reducer to rewrite.

use rustc_hash::FxHashSet;
use tracing::trace;
use vexed_common::{InstanceId, ScopeId};
use vexed_typeck::{Expr, TypeId};

use crate::error::EvalError;
use crate::heap::{Binding, Instance, PropertySlot, Scope};
use crate::runtime::Runtime;
use crate::value::NativeValue;

pub fn construct(rt: &mut Runtime, class: TypeId, args: Vec<Expr>) -> Result<InstanceId, EvalError> {
    let id = rt.heap.alloc_instance(Instance {
        ty: class,
        payload: NativeValue::None,
        scopes: Vec::new(),
        sealed: false,
        properties: Vec::new(),
    });

    let chain = rt.registry.ancestors(class);
    let mut scopes: Vec<(TypeId, ScopeId)> = Vec::with_capacity(chain.len());
    let mut args = args;
    for &ty in chain.iter().rev() {
        let scope = ctor_scope(rt, class, ty, id, args);
        args = rt
            .registry
            .def(ty)
            .extends_args
            .iter()
            .map(|a| Expr::scoped(scope, a.clone()))
            .collect();
        scopes.push((ty, scope));
    }
    scopes.reverse();

    let native = rt.natives.has_plugin(&rt.registry, class);
    let mut properties: Vec<PropertySlot> = Vec::new();
    for &(ty, scope) in &scopes {
        for prop in &rt.registry.def(ty).properties {
            let expr = match &prop.initializer {
                Some(init) => Expr::scoped(scope, init.clone()),
                None if native => Expr::member(Expr::Instance(id), prop.name.clone(), prop.ty),
                None => Expr::missing(prop.ty),
            };
            let slot = PropertySlot {
                name: prop.name.clone(),
                declaring: ty,
                ty: prop.ty,
                expr,
            };
            // A redeclaration in a subclass replaces the inherited slot.
            match properties.iter_mut().find(|p| p.name == slot.name) {
                Some(existing) => *existing = slot,
                None => properties.push(slot),
            }
        }
    }

    trace!(instance = %id, class = rt.registry.name(class), "constructed");
    let inst = rt.heap.instance_mut(id);
    inst.scopes = scopes;
    inst.properties = properties;
    Ok(id)
}

/// The constructor scope of `ty` for an instance of `class`. Method names
/// resolve virtually, so an ancestor calling `m()` reaches the most derived
/// override.
fn ctor_scope(rt: &mut Runtime, class: TypeId, ty: TypeId, receiver: InstanceId, args: Vec<Expr>) -> ScopeId {
    let params = rt.registry.def(ty).params.clone();
    let mut given = args.into_iter();
    let mut bindings: Vec<Binding> = params
        .into_iter()
        .map(|p| Binding {
            expr: given.next().unwrap_or(Expr::missing(p.ty)),
            name: p.name,
            ty: p.ty,
        })
        .collect();

    let mut seen = FxHashSet::default();
    for ancestor in rt.registry.ancestors(ty).into_iter().rev() {
        let names: Vec<String> = rt
            .registry
            .def(ancestor)
            .methods
            .iter()
            .map(|m| m.name.clone())
            .collect();
        for name in names {
            if !seen.insert(name.clone()) || bindings.iter().any(|b| b.name == name) {
                continue;
            }
            let Some(method) = rt.registry.find_method(class, &name) else {
                continue;
            };
            let ty = rt.registry.method_type(method);
            bindings.push(Binding {
                name,
                expr: Expr::UnboundFunction(method),
                ty,
            });
        }
    }

    rt.heap.alloc_scope(Scope {
        parent: None,
        receiver: Some(receiver),
        bindings,
        type_args: Vec::new(),
    })
}
