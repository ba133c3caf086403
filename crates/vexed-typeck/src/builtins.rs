//! Built-in type registration.
//!
//! Registers the primitive types at their reserved ids and declares the
//! native members the runtime's built-in plugins implement:
//!
//! - `any.toString(): string`
//! - `string.length: int`
//! - `any[].length: int`, `any[].join(separator: string): string`
//! - `Type.name: string`

use crate::registry::TypeRegistry;
use crate::ty::{MethodDef, Param, PropertyDef, TypeDefinition, TypeId, TypeKind, Visibility};

pub fn register_builtins(registry: &mut TypeRegistry) {
    let reserved = [
        ("any", TypeKind::Class, None),
        ("int", TypeKind::Class, Some(TypeId::ANY)),
        ("float", TypeKind::Class, Some(TypeId::ANY)),
        ("string", TypeKind::Class, Some(TypeId::ANY)),
        ("bool", TypeKind::Class, Some(TypeId::ANY)),
        ("Type", TypeKind::Class, Some(TypeId::ANY)),
        (
            "any[]",
            TypeKind::Array {
                element: TypeId::ANY,
            },
            Some(TypeId::ANY),
        ),
    ];
    for (expected, (name, kind, extends)) in reserved.into_iter().enumerate() {
        let id = registry
            .register(TypeDefinition::new(name, kind, extends))
            .expect("built-in types are registered into an empty registry");
        debug_assert_eq!(id, TypeId(expected as u32));
    }

    native_method(registry, TypeId::ANY, "toString", vec![], TypeId::STRING);
    native_property(registry, TypeId::STRING, "length", TypeId::INT);
    native_property(registry, TypeId::ANY_ARRAY, "length", TypeId::INT);
    native_method(
        registry,
        TypeId::ANY_ARRAY,
        "join",
        vec![Param::new("separator", TypeId::STRING)],
        TypeId::STRING,
    );
    native_property(registry, TypeId::TYPE, "name", TypeId::STRING);
}

fn native_property(registry: &mut TypeRegistry, owner: TypeId, name: &str, ty: TypeId) {
    registry.def_mut(owner).properties.push(PropertyDef {
        name: name.to_string(),
        visibility: Visibility::Public,
        ty,
        initializer: None,
    });
}

fn native_method(
    registry: &mut TypeRegistry,
    owner: TypeId,
    name: &str,
    params: Vec<Param>,
    ret: TypeId,
) {
    registry.def_mut(owner).methods.push(MethodDef {
        name: name.to_string(),
        params,
        generics: Vec::new(),
        ret,
        body: None,
        declaring: owner,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_members_are_declared() {
        let reg = TypeRegistry::new();
        assert!(reg.def(TypeId::STRING).property("length").is_some());
        let join = reg.find_method(TypeId::ANY_ARRAY, "join").unwrap();
        assert_eq!(reg.method(join).ret, TypeId::STRING);
        assert!(reg.method(join).body.is_none());
    }

    #[test]
    fn to_string_is_inherited_from_any() {
        let reg = TypeRegistry::new();
        let m = reg.find_method(TypeId::INT, "toString").unwrap();
        assert_eq!(m.owner, TypeId::ANY);
    }
}
