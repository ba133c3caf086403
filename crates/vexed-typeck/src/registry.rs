//! The type registry: one flat namespace of every type the program can name.
//!
//! Built-ins occupy the reserved ids of [`TypeId`]. Classes are declared
//! first (reserving an id so members can refer to their own type) and
//! completed later. Structural types are created on demand and memoized by
//! their canonical name, so `int[]` or `(string) => bool` always map to the
//! same id. Poison types are never memoized: each call to
//! [`TypeRegistry::new_poison`] yields a distinct type.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::builtins;
use crate::ty::{MethodDef, MethodRef, PropertyDef, TypeDefinition, TypeId, TypeKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("type `{0}` not found")]
    TypeNotFound(String),
    #[error("type `{0}` is already registered")]
    Duplicate(String),
}

#[derive(Debug, Clone)]
pub struct TypeRegistry {
    defs: Vec<TypeDefinition>,
    by_name: FxHashMap<String, TypeId>,
    poison_count: u32,
}

impl TypeRegistry {
    /// A registry holding only the built-in types.
    pub fn new() -> Self {
        let mut registry = TypeRegistry {
            defs: Vec::new(),
            by_name: FxHashMap::default(),
            poison_count: 0,
        };
        builtins::register_builtins(&mut registry);
        registry
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Register a complete definition under its name.
    pub fn register(&mut self, def: TypeDefinition) -> Result<TypeId, RegistryError> {
        if self.by_name.contains_key(&def.name) {
            return Err(RegistryError::Duplicate(def.name));
        }
        let id = TypeId(self.defs.len() as u32);
        self.by_name.insert(def.name.clone(), id);
        self.defs.push(def);
        Ok(id)
    }

    /// Reserve a class id with an empty body. Members are filled in later
    /// through [`TypeRegistry::def_mut`].
    pub fn declare_class(
        &mut self,
        name: &str,
        extends: Option<TypeId>,
    ) -> Result<TypeId, RegistryError> {
        self.register(TypeDefinition::new(name, TypeKind::Class, extends.or(Some(TypeId::ANY))))
    }

    pub fn get_type(&self, name: &str) -> Result<TypeId, RegistryError> {
        self.try_get_type(name)
            .ok_or_else(|| RegistryError::TypeNotFound(name.to_string()))
    }

    pub fn try_get_type(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn def(&self, id: TypeId) -> &TypeDefinition {
        &self.defs[id.index()]
    }

    pub fn def_mut(&mut self, id: TypeId) -> &mut TypeDefinition {
        &mut self.defs[id.index()]
    }

    /// Display name of a type.
    pub fn name(&self, id: TypeId) -> &str {
        &self.defs[id.index()].display
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.defs[id.index()].kind
    }

    // ── Structural types ────────────────────────────────────────────────

    pub fn create_array_type(&mut self, element: TypeId) -> TypeId {
        let key = format!("{}[]", self.def(element).name);
        if let Some(id) = self.try_get_type(&key) {
            return id;
        }
        let mut def = TypeDefinition::new(
            key,
            TypeKind::Array { element },
            Some(TypeId::ANY_ARRAY),
        );
        def.display = format!("{}[]", self.name(element));
        self.insert_structural(def)
    }

    pub fn create_function_type(&mut self, ret: TypeId, params: &[TypeId]) -> TypeId {
        let render = |f: &dyn Fn(TypeId) -> String| {
            let params: Vec<String> = params.iter().map(|&p| f(p)).collect();
            format!("({}) => {}", params.join(", "), f(ret))
        };
        let key = render(&|t| self.def(t).name.clone());
        if let Some(id) = self.try_get_type(&key) {
            return id;
        }
        let display = render(&|t| self.name(t).to_string());
        let mut def = TypeDefinition::new(
            key,
            TypeKind::Function {
                params: params.to_vec(),
                ret,
            },
            Some(TypeId::ANY),
        );
        def.display = display;
        self.insert_structural(def)
    }

    /// A generic placeholder named `name`, owned by `owner` (typically
    /// `Class.method`). Repeated requests return the same placeholder.
    pub fn create_generic_param(&mut self, owner: &str, name: &str) -> TypeId {
        let key = format!("{owner}.{name}");
        if let Some(id) = self.try_get_type(&key) {
            return id;
        }
        let mut def = TypeDefinition::new(key, TypeKind::GenericParam, Some(TypeId::ANY));
        def.display = name.to_string();
        self.insert_structural(def)
    }

    /// A fresh poison type, distinct from every other.
    pub fn new_poison(&mut self) -> TypeId {
        self.poison_count += 1;
        let mut def = TypeDefinition::new(
            format!("<poison#{}>", self.poison_count),
            TypeKind::Poison,
            None,
        );
        def.display = "<error>".to_string();
        self.insert_structural(def)
    }

    pub fn poison_count(&self) -> u32 {
        self.poison_count
    }

    fn insert_structural(&mut self, def: TypeDefinition) -> TypeId {
        let id = TypeId(self.defs.len() as u32);
        self.by_name.insert(def.name.clone(), id);
        self.defs.push(def);
        id
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn is_poison(&self, id: TypeId) -> bool {
        self.def(id).is_poison()
    }

    /// Whether a poison type appears anywhere in `id`'s shape.
    pub fn contains_poison(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::Poison => true,
            TypeKind::Array { element } => self.contains_poison(*element),
            TypeKind::Function { params, ret } => {
                self.contains_poison(*ret) || params.iter().any(|&p| self.contains_poison(p))
            }
            TypeKind::Class | TypeKind::GenericParam => false,
        }
    }

    pub fn contains_generic(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::GenericParam => true,
            TypeKind::Array { element } => self.contains_generic(*element),
            TypeKind::Function { params, ret } => {
                self.contains_generic(*ret) || params.iter().any(|&p| self.contains_generic(p))
            }
            TypeKind::Class | TypeKind::Poison => false,
        }
    }

    pub fn array_element(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Array { element } => Some(*element),
            _ => None,
        }
    }

    /// `id` and its ancestors, root first.
    pub fn ancestors(&self, id: TypeId) -> Vec<TypeId> {
        let mut chain = vec![id];
        let mut cur = self.def(id).extends;
        while let Some(parent) = cur {
            chain.push(parent);
            cur = self.def(parent).extends;
        }
        chain.reverse();
        chain
    }

    /// Nominal subtyping through the `extends` chain.
    pub fn is_subclass(&self, sub: TypeId, sup: TypeId) -> bool {
        let mut cur = Some(sub);
        while let Some(t) = cur {
            if t == sup {
                return true;
            }
            cur = self.def(t).extends;
        }
        false
    }

    /// The nearest declaration of property `name`, starting at `ty`.
    pub fn find_property(&self, ty: TypeId, name: &str) -> Option<(TypeId, &PropertyDef)> {
        let mut cur = Some(ty);
        while let Some(t) = cur {
            if let Some(p) = self.def(t).property(name) {
                return Some((t, p));
            }
            cur = self.def(t).extends;
        }
        None
    }

    /// Virtual method lookup: the most derived declaration of `name`.
    pub fn find_method(&self, ty: TypeId, name: &str) -> Option<MethodRef> {
        let mut cur = Some(ty);
        while let Some(t) = cur {
            if let Some(index) = self.def(t).method_index(name) {
                return Some(MethodRef { owner: t, index });
            }
            cur = self.def(t).extends;
        }
        None
    }

    pub fn method(&self, m: MethodRef) -> &MethodDef {
        &self.def(m.owner).methods[m.index]
    }

    /// The function type of a method's signature.
    pub fn method_type(&mut self, m: MethodRef) -> TypeId {
        let method = self.method(m);
        let ret = method.ret;
        let params: Vec<TypeId> = method.params.iter().map(|p| p.ty).collect();
        self.create_function_type(ret, &params)
    }

    /// Rebuild `ty` with generic placeholders replaced by `lookup`.
    /// Placeholders `lookup` does not know are left in place.
    pub fn substitute(&mut self, ty: TypeId, lookup: &dyn Fn(TypeId) -> Option<TypeId>) -> TypeId {
        match self.kind(ty).clone() {
            TypeKind::GenericParam => lookup(ty).unwrap_or(ty),
            TypeKind::Array { element } => {
                let element = self.substitute(element, lookup);
                self.create_array_type(element)
            }
            TypeKind::Function { params, ret } => {
                let ret = self.substitute(ret, lookup);
                let params: Vec<TypeId> =
                    params.iter().map(|&p| self.substitute(p, lookup)).collect();
                self.create_function_type(ret, &params)
            }
            TypeKind::Class | TypeKind::Poison => ty,
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
