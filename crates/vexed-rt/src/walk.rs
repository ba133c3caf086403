//! Discovery of the live graph below a root instance.
//!
//! Each sweep starts by collecting every scope, instance and promise
//! reachable from the root. Sealed instances are frozen and contribute
//! nothing further, so the walk stops at them; everything else is followed
//! through scope parents, receivers and bindings, instance constructor
//! scopes, property slots and array elements, and the handles embedded in
//! the nodes stored there.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use vexed_common::{InstanceId, PromiseId, ScopeId};
use vexed_typeck::visit::{visit_children, Visit};
use vexed_typeck::Expr;

use crate::heap::{Heap, PromiseState};
use crate::value::NativeValue;

/// Everything reachable from a root, in discovery order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Discovery {
    pub scopes: Vec<ScopeId>,
    pub instances: Vec<InstanceId>,
    pub promises: Vec<PromiseId>,
}

#[derive(Clone, Copy)]
enum Node {
    Scope(ScopeId),
    Instance(InstanceId),
    Promise(PromiseId),
}

/// Collects the handles mentioned by one expression tree.
struct Refs<'a> {
    heap: &'a Heap,
    out: &'a mut Vec<Node>,
}

impl Visit for Refs<'_> {
    fn visit_expr(&mut self, expr: &Expr) -> bool {
        match expr {
            Expr::Instance(id) => self.out.push(Node::Instance(*id)),
            Expr::Function { receiver, .. } => self.out.push(Node::Instance(*receiver)),
            Expr::Scoped { scope, .. } => self.out.push(Node::Scope(*scope)),
            Expr::Promise { id, .. } => {
                self.out.push(Node::Promise(*id));
                let heap = self.heap;
                if let PromiseState::Resolved(resolved) = heap.promise(*id) {
                    self.visit_expr(resolved);
                }
            }
            _ => {}
        }
        visit_children(self, expr);
        true
    }
}

fn refs(heap: &Heap, expr: &Expr, out: &mut Vec<Node>) {
    Refs { heap, out }.visit_expr(expr);
}

pub fn discover(heap: &Heap, root: InstanceId) -> Discovery {
    let mut found = Discovery::default();
    let mut seen_scopes = FxHashSet::default();
    let mut seen_instances = FxHashSet::default();
    let mut seen_promises = FxHashSet::default();

    let mut queue = VecDeque::from([Node::Instance(root)]);
    let mut pending = Vec::new();
    while let Some(node) = queue.pop_front() {
        match node {
            Node::Scope(id) => {
                if !seen_scopes.insert(id) {
                    continue;
                }
                found.scopes.push(id);
                let scope = heap.scope(id);
                pending.extend(scope.parent.map(Node::Scope));
                pending.extend(scope.receiver.map(Node::Instance));
                for binding in &scope.bindings {
                    refs(heap, &binding.expr, &mut pending);
                }
            }
            Node::Instance(id) => {
                if !seen_instances.insert(id) {
                    continue;
                }
                let inst = heap.instance(id);
                if inst.sealed {
                    continue;
                }
                found.instances.push(id);
                pending.extend(inst.scopes.iter().map(|&(_, s)| Node::Scope(s)));
                for slot in &inst.properties {
                    refs(heap, &slot.expr, &mut pending);
                }
                if let NativeValue::Array(elements) = &inst.payload {
                    for element in elements {
                        refs(heap, element, &mut pending);
                    }
                }
            }
            Node::Promise(id) => {
                if seen_promises.insert(id) {
                    found.promises.push(id);
                }
            }
        }
        queue.extend(pending.drain(..));
    }
    found
}
