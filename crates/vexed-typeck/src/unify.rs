//! Assignability and one-directional generic inference.
//!
//! [`is_type_assignable`] answers whether a value of `source` type may flow
//! into a `target` slot. When the target mentions generic placeholders that
//! are being inferred (the parameters of the method being called), the
//! check binds them from the source's shape. Bindings live in an `ena`
//! union-find table so a placeholder bound to another placeholder shares its
//! eventual value.
//!
//! Poison types are assignable in both directions, at any depth of an
//! array or function shape. This is what keeps a single malformed
//! declaration from producing a diagnostic at every use.

use ena::unify::{EqUnifyValue, InPlaceUnificationTable, UnifyKey};
use rustc_hash::FxHashMap;

use crate::registry::TypeRegistry;
use crate::ty::{TypeId, TypeKind};

/// Key into the binding table. One per inferable generic parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GenericVar(u32);

impl UnifyKey for GenericVar {
    type Value = Option<TypeId>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        GenericVar(u)
    }

    fn tag() -> &'static str {
        "GenericVar"
    }
}

impl EqUnifyValue for TypeId {}

/// The binding map for one call site.
pub struct GenericBindings {
    table: InPlaceUnificationTable<GenericVar>,
    vars: FxHashMap<TypeId, GenericVar>,
    order: Vec<TypeId>,
}

impl GenericBindings {
    /// Bindings with no inferable parameters: plain assignability.
    pub fn empty() -> Self {
        Self::for_params(&[])
    }

    /// Bindings that infer exactly `params`. Other placeholders are treated
    /// nominally, as the enclosing method's own type parameters would be.
    pub fn for_params(params: &[TypeId]) -> Self {
        let mut table = InPlaceUnificationTable::new();
        let mut vars = FxHashMap::default();
        for &p in params {
            vars.insert(p, table.new_key(None));
        }
        GenericBindings {
            table,
            vars,
            order: params.to_vec(),
        }
    }

    pub fn is_inferable(&self, param: TypeId) -> bool {
        self.vars.contains_key(&param)
    }

    pub fn get(&mut self, param: TypeId) -> Option<TypeId> {
        let var = *self.vars.get(&param)?;
        self.table.probe_value(var)
    }

    fn bind(&mut self, param: TypeId, ty: TypeId) -> bool {
        match self.vars.get(&param) {
            Some(&var) => self.table.unify_var_value(var, Some(ty)).is_ok(),
            None => false,
        }
    }

    fn link(&mut self, a: TypeId, b: TypeId) -> bool {
        match (self.vars.get(&a), self.vars.get(&b)) {
            (Some(&va), Some(&vb)) => self.table.unify_var_var(va, vb).is_ok(),
            _ => false,
        }
    }

    /// Every inferable parameter with its binding. Parameters the call left
    /// unconstrained resolve to `any`.
    pub fn resolved(&mut self) -> Vec<(TypeId, TypeId)> {
        let order = self.order.clone();
        order
            .into_iter()
            .map(|p| (p, self.get(p).unwrap_or(TypeId::ANY)))
            .collect()
    }
}

/// Whether `source` may be used where `target` is expected, inferring
/// `bindings` along the way.
pub fn is_type_assignable(
    registry: &TypeRegistry,
    source: TypeId,
    target: TypeId,
    bindings: &mut GenericBindings,
) -> bool {
    if source == target {
        return true;
    }
    if registry.is_poison(source) || registry.is_poison(target) {
        return true;
    }
    if target == TypeId::ANY {
        return true;
    }

    if bindings.is_inferable(target) {
        if bindings.is_inferable(source) {
            return bindings.link(source, target);
        }
        return match bindings.get(target) {
            Some(bound) => {
                // A poisoned argument never contradicts an earlier binding,
                // and a placeholder already bound to poison accepts anything.
                is_type_assignable(registry, source, bound, &mut GenericBindings::empty())
            }
            None => bindings.bind(target, source),
        };
    }
    if bindings.is_inferable(source) {
        return match bindings.get(source) {
            Some(bound) => is_type_assignable(registry, bound, target, bindings),
            None => true,
        };
    }

    match (registry.kind(source), registry.kind(target)) {
        (TypeKind::Array { element: s }, TypeKind::Array { element: t }) => {
            let (s, t) = (*s, *t);
            is_type_assignable(registry, s, t, bindings)
        }
        (
            TypeKind::Function {
                params: sp,
                ret: sr,
            },
            TypeKind::Function {
                params: tp,
                ret: tr,
            },
        ) => {
            if sp.len() != tp.len() {
                return false;
            }
            let pairs: Vec<(TypeId, TypeId)> = sp.iter().copied().zip(tp.iter().copied()).collect();
            let (sr, tr) = (*sr, *tr);
            // Parameters are compared in the inference direction so a
            // placeholder in the target's parameter list binds from the
            // source's concrete parameter.
            pairs
                .into_iter()
                .all(|(s, t)| is_type_assignable(registry, s, t, bindings))
                && is_type_assignable(registry, sr, tr, bindings)
        }
        _ => registry.is_subclass(source, target),
    }
}
