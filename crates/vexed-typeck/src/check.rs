//! Site checks used by lowering.
//!
//! Lowering calls into a [`Checker`] at every site where two types must
//! agree: annotations, calls, returns, member accesses and operators. A
//! failing check records exactly one [`TypeError`] and hands back a fresh
//! poison type for that site. A check whose inputs already contain poison
//! never records anything: the root cause was reported where the poison was
//! created.

use vexed_common::Location;

use crate::diagnostics::{render_diagnostic, DiagnosticOptions};
use crate::error::{ConstraintOrigin, TypeError};
use crate::registry::{RegistryError, TypeRegistry};
use crate::tst::{BinaryOp, UnaryOp};
use crate::ty::{MethodRef, TypeId};
use crate::unify::{is_type_assignable, GenericBindings};

/// Result of checking a call site.
#[derive(Clone, Debug, PartialEq)]
pub struct CallCheck {
    /// The call's result type with inferred generics substituted, or a
    /// poison type when the call failed to check.
    pub ret: TypeId,
    /// Inferred generic arguments, in declaration order. Lowering stores
    /// these on the call node.
    pub type_args: Vec<(TypeId, TypeId)>,
}

pub struct Checker<'r> {
    registry: &'r mut TypeRegistry,
    errors: Vec<TypeError>,
}

impl<'r> Checker<'r> {
    pub fn new(registry: &'r mut TypeRegistry) -> Self {
        Checker {
            registry,
            errors: Vec::new(),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &*self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut *self.registry
    }

    pub fn errors(&self) -> &[TypeError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<TypeError> {
        self.errors
    }

    /// Render every recorded error.
    pub fn render_errors(
        &self,
        source: &str,
        filename: &str,
        options: &DiagnosticOptions,
    ) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| render_diagnostic(e, source, filename, options))
            .collect()
    }

    fn report(&mut self, error: TypeError) -> TypeId {
        self.errors.push(error);
        self.registry.new_poison()
    }

    /// If any input carries poison, the type this site should propagate
    /// without reporting: the poison input itself, or a fresh poison when
    /// the poison is nested inside a shape.
    fn propagate(&mut self, inputs: &[TypeId]) -> Option<TypeId> {
        if let Some(&p) = inputs.iter().find(|&&t| self.registry.is_poison(t)) {
            return Some(p);
        }
        if inputs.iter().any(|&t| self.registry.contains_poison(t)) {
            return Some(self.registry.new_poison());
        }
        None
    }

    // ── Declarations ────────────────────────────────────────────────────

    /// Resolve a written type name. `T[]` suffixes build array types; an
    /// unknown base name is reported once and becomes poison, so `Foo[][]`
    /// with an unknown `Foo` is one diagnostic and a poisoned array shape.
    pub fn resolve_type_name(&mut self, name: &str, loc: &Location) -> TypeId {
        if let Some(element) = name.strip_suffix("[]") {
            let element = self.resolve_type_name(element, loc);
            return self.registry.create_array_type(element);
        }
        match self.registry.try_get_type(name) {
            Some(ty) => ty,
            None => self.report(TypeError::UnknownType {
                name: name.to_string(),
                loc: loc.clone(),
            }),
        }
    }

    pub fn declare_class(
        &mut self,
        name: &str,
        extends: Option<TypeId>,
        loc: &Location,
    ) -> TypeId {
        match self.registry.declare_class(name, extends) {
            Ok(id) => id,
            Err(RegistryError::Duplicate(name)) => self.report(TypeError::DuplicateType {
                name,
                loc: loc.clone(),
            }),
            Err(RegistryError::TypeNotFound(name)) => self.report(TypeError::UnknownType {
                name,
                loc: loc.clone(),
            }),
        }
    }

    // ── Value flow ──────────────────────────────────────────────────────

    /// Check that `value` may flow into a slot of type `target`. Returns the
    /// slot type on success.
    pub fn check_assignment(
        &mut self,
        value: TypeId,
        target: TypeId,
        origin: ConstraintOrigin,
    ) -> TypeId {
        if self.propagate(&[value, target]).is_some() {
            return target;
        }
        let mut bindings = GenericBindings::empty();
        if is_type_assignable(self.registry, value, target, &mut bindings) {
            return target;
        }
        let (expected, found) = (
            self.registry.name(target).to_string(),
            self.registry.name(value).to_string(),
        );
        self.report(TypeError::Mismatch {
            expected,
            found,
            origin,
        })
    }

    pub fn check_return(&mut self, value: TypeId, ret: TypeId, loc: &Location) -> TypeId {
        self.check_assignment(value, ret, ConstraintOrigin::Return { loc: loc.clone() })
    }

    /// Check a call to `method` with arguments of the given types, inferring
    /// the method's generic parameters from the arguments.
    ///
    /// At most one diagnostic is recorded per call: the first failing
    /// argument stops the check.
    pub fn check_call(&mut self, method: MethodRef, args: &[TypeId], loc: &Location) -> CallCheck {
        let def = self.registry.method(method);
        let params: Vec<TypeId> = def.params.iter().map(|p| p.ty).collect();
        let generics = def.generics.clone();
        let ret = def.ret;

        if params.len() != args.len() {
            let ret = self.report(TypeError::ArityMismatch {
                expected: params.len(),
                found: args.len(),
                loc: loc.clone(),
            });
            return CallCheck {
                ret,
                type_args: Vec::new(),
            };
        }

        let mut bindings = GenericBindings::for_params(&generics);
        for (index, (&arg, &param)) in args.iter().zip(&params).enumerate() {
            if self.registry.contains_poison(arg) {
                continue;
            }
            if is_type_assignable(self.registry, arg, param, &mut bindings) {
                continue;
            }
            let bound = bindings.resolved();
            let expected = self
                .registry
                .substitute(param, &|p| lookup(&bound, p));
            let error = TypeError::Mismatch {
                expected: self.registry.name(expected).to_string(),
                found: self.registry.name(arg).to_string(),
                origin: ConstraintOrigin::Argument {
                    call: loc.clone(),
                    index,
                },
            };
            return CallCheck {
                ret: self.report(error),
                type_args: Vec::new(),
            };
        }

        let type_args = bindings.resolved();
        let ret = self.registry.substitute(ret, &|p| lookup(&type_args, p));
        CallCheck { ret, type_args }
    }

    /// The type of `object.member`: a property type, or the function type of
    /// a method.
    pub fn check_member(&mut self, object: TypeId, member: &str, loc: &Location) -> TypeId {
        if self.registry.is_poison(object) {
            return object;
        }
        if let Some((_, prop)) = self.registry.find_property(object, member) {
            return prop.ty;
        }
        if let Some(method) = self.registry.find_method(object, member) {
            return self.registry.method_type(method);
        }
        if let Some(poison) = self.propagate(&[object]) {
            return poison;
        }
        let ty = self.registry.name(object).to_string();
        self.report(TypeError::NoSuchMember {
            ty,
            member: member.to_string(),
            loc: loc.clone(),
        })
    }

    pub fn check_binary(
        &mut self,
        op: BinaryOp,
        lhs: TypeId,
        rhs: TypeId,
        loc: &Location,
    ) -> TypeId {
        if let Some(poison) = self.propagate(&[lhs, rhs]) {
            return poison;
        }
        if lhs == rhs {
            if let Some(result) = binary_result(op, lhs) {
                return result;
            }
        }
        let (l, r) = (
            self.registry.name(lhs).to_string(),
            self.registry.name(rhs).to_string(),
        );
        self.report(TypeError::InvalidOperator {
            op: op.symbol().to_string(),
            lhs: l,
            rhs: Some(r),
            loc: loc.clone(),
        })
    }

    pub fn check_unary(&mut self, op: UnaryOp, operand: TypeId, loc: &Location) -> TypeId {
        // `typeof` reflects whatever static type the operand has, poison
        // included.
        if op == UnaryOp::TypeOf {
            return TypeId::TYPE;
        }
        if let Some(poison) = self.propagate(&[operand]) {
            return poison;
        }
        let ok = match op {
            UnaryOp::Neg => operand == TypeId::INT || operand == TypeId::FLOAT,
            UnaryOp::Not => operand == TypeId::BOOL,
            UnaryOp::TypeOf => true,
        };
        if ok {
            return operand;
        }
        let name = self.registry.name(operand).to_string();
        self.report(TypeError::InvalidOperator {
            op: op.symbol().trim_end().to_string(),
            lhs: name,
            rhs: None,
            loc: loc.clone(),
        })
    }
}

fn lookup(bound: &[(TypeId, TypeId)], param: TypeId) -> Option<TypeId> {
    bound.iter().find(|(p, _)| *p == param).map(|(_, t)| *t)
}

/// Result type of `op` applied to two operands of type `ty`, if defined.
fn binary_result(op: BinaryOp, ty: TypeId) -> Option<TypeId> {
    let numeric = ty == TypeId::INT || ty == TypeId::FLOAT;
    match op {
        BinaryOp::Add if numeric || ty == TypeId::STRING => Some(ty),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem if numeric => Some(ty),
        BinaryOp::Eq | BinaryOp::Ne => Some(TypeId::BOOL),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
            if numeric || ty == TypeId::STRING =>
        {
            Some(TypeId::BOOL)
        }
        BinaryOp::And | BinaryOp::Or if ty == TypeId::BOOL => Some(TypeId::BOOL),
        _ => None,
    }
}
