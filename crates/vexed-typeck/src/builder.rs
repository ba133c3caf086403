//! Programmatic class construction.
//!
//! Lowering (and the runtime's tests) declare classes through a
//! [`ClassBuilder`]: the id is reserved up front so members can mention the
//! class being built, and the body is written into the registry by
//! [`ClassBuilder::finish`].

use crate::registry::{RegistryError, TypeRegistry};
use crate::tst::{Block, Expr};
use crate::ty::{MethodDef, Param, PropertyDef, TypeId, Visibility};

#[derive(Debug)]
pub struct ClassBuilder {
    id: TypeId,
    extends: Option<TypeId>,
    extends_args: Vec<Expr>,
    params: Vec<Param>,
    properties: Vec<PropertyDef>,
    methods: Vec<MethodDef>,
}

impl ClassBuilder {
    pub fn declare(registry: &mut TypeRegistry, name: &str) -> Result<Self, RegistryError> {
        let id = registry.declare_class(name, None)?;
        Ok(ClassBuilder {
            id,
            extends: None,
            extends_args: Vec::new(),
            params: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
        })
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Set the parent class and the arguments passed to its constructor.
    /// The arguments are evaluated in this class's constructor scope.
    pub fn extends(mut self, parent: TypeId, args: Vec<Expr>) -> Self {
        self.extends = Some(parent);
        self.extends_args = args;
        self
    }

    pub fn param(mut self, name: &str, ty: TypeId) -> Self {
        self.params.push(Param::new(name, ty));
        self
    }

    pub fn property(self, name: &str, ty: TypeId, init: Expr) -> Self {
        self.push_property(name, Visibility::Public, ty, Some(init))
    }

    pub fn private_property(self, name: &str, ty: TypeId, init: Expr) -> Self {
        self.push_property(name, Visibility::Private, ty, Some(init))
    }

    /// A property with no initializer, resolved by the class's native
    /// plugin.
    pub fn native_property(self, name: &str, ty: TypeId) -> Self {
        self.push_property(name, Visibility::Public, ty, None)
    }

    fn push_property(
        mut self,
        name: &str,
        visibility: Visibility,
        ty: TypeId,
        initializer: Option<Expr>,
    ) -> Self {
        self.properties.push(PropertyDef {
            name: name.to_string(),
            visibility,
            ty,
            initializer,
        });
        self
    }

    pub fn method(self, name: &str, params: Vec<Param>, ret: TypeId, body: Block) -> Self {
        self.generic_method(name, Vec::new(), params, ret, body)
    }

    /// A method with generic parameters. `generics` are placeholders from
    /// [`TypeRegistry::create_generic_param`].
    pub fn generic_method(
        mut self,
        name: &str,
        generics: Vec<TypeId>,
        params: Vec<Param>,
        ret: TypeId,
        body: Block,
    ) -> Self {
        self.methods.push(MethodDef {
            name: name.to_string(),
            params,
            generics,
            ret,
            body: Some(body),
            declaring: self.id,
        });
        self
    }

    /// A bodiless method implemented by the class's native plugin.
    pub fn native_method(mut self, name: &str, params: Vec<Param>, ret: TypeId) -> Self {
        self.methods.push(MethodDef {
            name: name.to_string(),
            params,
            generics: Vec::new(),
            ret,
            body: None,
            declaring: self.id,
        });
        self
    }

    /// Write the collected members into the registry.
    pub fn finish(self, registry: &mut TypeRegistry) -> TypeId {
        let def = registry.def_mut(self.id);
        if let Some(parent) = self.extends {
            def.extends = Some(parent);
        }
        def.extends_args = self.extends_args;
        def.params = self.params;
        def.properties = self.properties;
        def.methods = self.methods;
        self.id
    }
}
