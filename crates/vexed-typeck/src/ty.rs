//! Type representation for the Vexed type system.
//!
//! Every type lives in the [`TypeRegistry`](crate::registry::TypeRegistry)
//! and is referred to by a copyable [`TypeId`]. A [`TypeDefinition`] carries
//! everything lowering knows about a type: its parent, constructor
//! parameters, properties and methods. Structural types (arrays, functions),
//! generic placeholders and poison markers are definitions too, so the
//! registry stays a single flat namespace.

use std::fmt;

use crate::tst::{Block, Expr};

/// Handle to a registered type.
///
/// The first few indices are reserved for the built-in types and are
/// guaranteed by [`TypeRegistry::new`](crate::registry::TypeRegistry::new).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Root of every class hierarchy; accepts any value.
    pub const ANY: TypeId = TypeId(0);
    pub const INT: TypeId = TypeId(1);
    pub const FLOAT: TypeId = TypeId(2);
    pub const STRING: TypeId = TypeId(3);
    pub const BOOL: TypeId = TypeId(4);
    /// Runtime reflection of a static type (the result of `typeof`).
    pub const TYPE: TypeId = TypeId(5);
    /// Root of the array chain: every `T[]` extends `any[]`.
    pub const ANY_ARRAY: TypeId = TypeId(6);

    /// Number of reserved ids.
    pub const FIRST_DYNAMIC: u32 = 7;

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_builtin(self) -> bool {
        self.0 < Self::FIRST_DYNAMIC
    }
}

/// What shape of type a definition describes.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeKind {
    /// A nominal class, built-in or script-declared.
    Class,
    /// `element[]`.
    Array { element: TypeId },
    /// `(params) => ret`.
    Function { params: Vec<TypeId>, ret: TypeId },
    /// A generic placeholder declared on a method.
    GenericParam,
    /// Error-recovery marker for one failed resolution site.
    Poison,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeId,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Param {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDef {
    pub name: String,
    pub visibility: Visibility,
    pub ty: TypeId,
    /// `None` for native-backed properties resolved by the type's plugin.
    pub initializer: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodDef {
    pub name: String,
    pub params: Vec<Param>,
    pub generics: Vec<TypeId>,
    pub ret: TypeId,
    /// `None` for native methods; the declaring type's plugin handles calls.
    pub body: Option<Block>,
    pub declaring: TypeId,
}

/// Identifies one method: the declaring type and its index in that type's
/// method list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub owner: TypeId,
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeDefinition {
    /// Unique registry key.
    pub name: String,
    /// Name shown in diagnostics. Differs from `name` only for generic
    /// placeholders, whose key is qualified by their owner.
    pub display: String,
    pub kind: TypeKind,
    pub extends: Option<TypeId>,
    /// Arguments passed to the parent constructor, evaluated in this type's
    /// constructor scope.
    pub extends_args: Vec<Expr>,
    pub params: Vec<Param>,
    pub properties: Vec<PropertyDef>,
    pub methods: Vec<MethodDef>,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>, kind: TypeKind, extends: Option<TypeId>) -> Self {
        let name = name.into();
        TypeDefinition {
            display: name.clone(),
            name,
            kind,
            extends,
            extends_args: Vec::new(),
            params: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn is_poison(&self) -> bool {
        matches!(self.kind, TypeKind::Poison)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn method_index(&self, name: &str) -> Option<usize> {
        self.methods.iter().position(|m| m.name == name)
    }
}

impl fmt::Display for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
