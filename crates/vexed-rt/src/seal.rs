//! Sealing: freezing instances whose state can no longer change.
//!
//! An instance may be sealed once every property slot and array element is
//! terminal and every instance those values reference is sealed too, or is
//! being sealed in the same pass. The second condition is a greatest fixed
//! point so that reference cycles between finished instances seal together.
//! Sealing fires the type plugin's `sealed_instance` hook exactly once.

use rustc_hash::FxHashSet;
use tracing::debug;
use vexed_common::InstanceId;
use vexed_typeck::Expr;

use crate::error::EvalError;
use crate::heap::{Heap, Instance};
use crate::runtime::Runtime;
use crate::value::NativeValue;
use crate::walk::Discovery;

fn values(inst: &Instance) -> impl Iterator<Item = &Expr> {
    let elements: &[Expr] = match &inst.payload {
        NativeValue::Array(elements) => elements,
        _ => &[],
    };
    inst.properties.iter().map(|p| &p.expr).chain(elements)
}

fn referenced(expr: &Expr) -> Option<InstanceId> {
    match expr {
        Expr::Instance(id) => Some(*id),
        Expr::Function { receiver, .. } => Some(*receiver),
        _ => None,
    }
}

fn sealable(heap: &Heap, id: InstanceId) -> bool {
    let inst = heap.instance(id);
    !inst.sealed && values(inst).all(Expr::is_terminal)
}

/// Seal what can be sealed among the discovered instances. Returns the
/// number of instances sealed.
pub fn seal(rt: &mut Runtime, found: &Discovery) -> Result<usize, EvalError> {
    let mut candidates: FxHashSet<InstanceId> = found
        .instances
        .iter()
        .copied()
        .filter(|&id| sealable(&rt.heap, id))
        .collect();

    loop {
        let heap = &rt.heap;
        let blocked: Vec<InstanceId> = candidates
            .iter()
            .copied()
            .filter(|&id| {
                values(heap.instance(id))
                    .filter_map(referenced)
                    .any(|r| !heap.instance(r).sealed && !candidates.contains(&r))
            })
            .collect();
        if blocked.is_empty() {
            break;
        }
        for id in blocked {
            candidates.remove(&id);
        }
    }

    let mut sealed = 0;
    for &id in found.instances.iter().rev() {
        if !candidates.contains(&id) {
            continue;
        }
        let ty = rt.heap.instance(id).ty;
        rt.heap.instance_mut(id).sealed = true;
        let plugin = rt.natives.plugin_for(&rt.registry, ty);
        plugin.sealed_instance(rt, id)?;
        debug!(instance = %id, ty = rt.registry.name(ty), "sealed");
        sealed += 1;
    }
    Ok(sealed)
}
