//! Plugins for the built-in types.
//!
//! Operators on scalars produce literal nodes, which the next sweep turns
//! into sealed scalar instances.

use std::cmp::Ordering;
use std::sync::Arc;

use vexed_common::InstanceId;
use vexed_typeck::{BinaryOp, Expr, MethodRef, Operator, TypeId, UnaryOp};

use super::{identity_operator, resolve_slot, CallOutcome, NativeType, Natives, TO_STRING_HOOK};
use crate::error::EvalError;
use crate::runtime::Runtime;
use crate::value::NativeValue;

pub fn install(natives: &mut Natives) {
    let hook = natives.register_hook(Arc::new(to_string));
    debug_assert_eq!(hook, TO_STRING_HOOK);

    natives.register(TypeId::INT, Arc::new(IntType));
    natives.register(TypeId::FLOAT, Arc::new(FloatType));
    natives.register(TypeId::STRING, Arc::new(StringType));
    natives.register(TypeId::BOOL, Arc::new(BoolType));
    natives.register(TypeId::ANY_ARRAY, Arc::new(ArrayType));
    natives.register(TypeId::TYPE, Arc::new(ReflectedType));
}

fn to_string(rt: &mut Runtime, instance: InstanceId) -> Result<Expr, EvalError> {
    let text = rt
        .scalar_text(instance)
        .unwrap_or_else(|| rt.type_name(instance));
    Ok(Expr::string(text))
}

// ── Payload access ─────────────────────────────────────────────────────

fn invalid(rt: &Runtime, id: InstanceId, expected: &'static str) -> EvalError {
    EvalError::InvalidPayload {
        ty: rt.type_name(id),
        expected,
    }
}

fn int(rt: &Runtime, id: InstanceId) -> Result<i64, EvalError> {
    match rt.heap.payload(id) {
        NativeValue::Int(n) => Ok(*n),
        _ => Err(invalid(rt, id, "int")),
    }
}

fn float(rt: &Runtime, id: InstanceId) -> Result<f64, EvalError> {
    match rt.heap.payload(id) {
        NativeValue::Float(x) => Ok(*x),
        _ => Err(invalid(rt, id, "float")),
    }
}

fn string(rt: &Runtime, id: InstanceId) -> Result<&str, EvalError> {
    match rt.heap.payload(id) {
        NativeValue::String(s) => Ok(s),
        _ => Err(invalid(rt, id, "string")),
    }
}

fn boolean(rt: &Runtime, id: InstanceId) -> Result<bool, EvalError> {
    match rt.heap.payload(id) {
        NativeValue::Bool(b) => Ok(*b),
        _ => Err(invalid(rt, id, "bool")),
    }
}

fn elements(rt: &Runtime, id: InstanceId) -> Result<&[Expr], EvalError> {
    match rt.heap.payload(id) {
        NativeValue::Array(elements) => Ok(elements),
        _ => Err(invalid(rt, id, "array")),
    }
}

fn unsupported(rt: &Runtime, op: Operator, id: InstanceId) -> EvalError {
    EvalError::UnsupportedOperator {
        op: op.to_string(),
        ty: rt.type_name(id),
    }
}

fn compare(op: BinaryOp, ordering: Option<Ordering>) -> Option<bool> {
    let ordering = ordering?;
    Some(match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::Ne => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => return None,
    })
}

fn checked(value: Option<i64>, op: BinaryOp) -> Result<Expr, EvalError> {
    value.map(Expr::int).ok_or_else(|| EvalError::Overflow {
        op: op.symbol().to_string(),
    })
}

// ── int ────────────────────────────────────────────────────────────────

struct IntType;

impl NativeType for IntType {
    fn resolve_operator(
        &self,
        rt: &mut Runtime,
        op: Operator,
        operands: &[InstanceId],
    ) -> Result<Option<Expr>, EvalError> {
        match (op, operands) {
            (Operator::Binary(bin), &[l, r]) => {
                let (a, b) = (int(rt, l)?, int(rt, r)?);
                let result = match bin {
                    BinaryOp::Add => checked(a.checked_add(b), bin)?,
                    BinaryOp::Sub => checked(a.checked_sub(b), bin)?,
                    BinaryOp::Mul => checked(a.checked_mul(b), bin)?,
                    BinaryOp::Div | BinaryOp::Rem if b == 0 => {
                        return Err(EvalError::DivisionByZero)
                    }
                    BinaryOp::Div => checked(a.checked_div(b), bin)?,
                    BinaryOp::Rem => checked(a.checked_rem(b), bin)?,
                    _ => match compare(bin, Some(a.cmp(&b))) {
                        Some(v) => Expr::bool(v),
                        None => return Err(unsupported(rt, op, l)),
                    },
                };
                Ok(Some(result))
            }
            (Operator::Unary(UnaryOp::Neg), &[x]) => {
                let n = int(rt, x)?;
                n.checked_neg()
                    .map(|v| Some(Expr::int(v)))
                    .ok_or_else(|| EvalError::Overflow { op: "-".into() })
            }
            _ => Err(unsupported(rt, op, operands[0])),
        }
    }
}

// ── float ──────────────────────────────────────────────────────────────

struct FloatType;

impl NativeType for FloatType {
    fn resolve_operator(
        &self,
        rt: &mut Runtime,
        op: Operator,
        operands: &[InstanceId],
    ) -> Result<Option<Expr>, EvalError> {
        match (op, operands) {
            (Operator::Binary(bin), &[l, r]) => {
                let (a, b) = (float(rt, l)?, float(rt, r)?);
                let result = match bin {
                    BinaryOp::Add => Expr::float(a + b),
                    BinaryOp::Sub => Expr::float(a - b),
                    BinaryOp::Mul => Expr::float(a * b),
                    BinaryOp::Div | BinaryOp::Rem if b == 0.0 => {
                        return Err(EvalError::DivisionByZero)
                    }
                    BinaryOp::Div => Expr::float(a / b),
                    BinaryOp::Rem => Expr::float(a % b),
                    _ => match compare(bin, a.partial_cmp(&b)) {
                        Some(v) => Expr::bool(v),
                        // NaN compares unequal to everything.
                        None if bin == BinaryOp::Ne => Expr::bool(true),
                        None if bin.is_comparison() => Expr::bool(false),
                        None => return Err(unsupported(rt, op, l)),
                    },
                };
                Ok(Some(result))
            }
            (Operator::Unary(UnaryOp::Neg), &[x]) => Ok(Some(Expr::float(-float(rt, x)?))),
            _ => Err(unsupported(rt, op, operands[0])),
        }
    }
}

// ── string ─────────────────────────────────────────────────────────────

struct StringType;

impl NativeType for StringType {
    fn resolve_property(
        &self,
        rt: &mut Runtime,
        instance: InstanceId,
        name: &str,
    ) -> Result<Option<Expr>, EvalError> {
        match name {
            "length" => {
                let len = string(rt, instance)?.chars().count();
                Ok(Some(Expr::int(len as i64)))
            }
            _ => resolve_slot(rt, instance, name),
        }
    }

    fn resolve_operator(
        &self,
        rt: &mut Runtime,
        op: Operator,
        operands: &[InstanceId],
    ) -> Result<Option<Expr>, EvalError> {
        match (op, operands) {
            (Operator::Binary(BinaryOp::Add), &[l, r]) => {
                let joined = format!("{}{}", string(rt, l)?, string(rt, r)?);
                Ok(Some(Expr::string(joined)))
            }
            (Operator::Binary(bin), &[l, r]) => {
                let ordering = string(rt, l)?.cmp(string(rt, r)?);
                match compare(bin, Some(ordering)) {
                    Some(v) => Ok(Some(Expr::bool(v))),
                    None => Err(unsupported(rt, op, l)),
                }
            }
            _ => Err(unsupported(rt, op, operands[0])),
        }
    }
}

// ── bool ───────────────────────────────────────────────────────────────

struct BoolType;

impl NativeType for BoolType {
    fn resolve_operator(
        &self,
        rt: &mut Runtime,
        op: Operator,
        operands: &[InstanceId],
    ) -> Result<Option<Expr>, EvalError> {
        let value = match (op, operands) {
            (Operator::Binary(bin), &[l, r]) => {
                let (a, b) = (boolean(rt, l)?, boolean(rt, r)?);
                match bin {
                    BinaryOp::And => a && b,
                    BinaryOp::Or => a || b,
                    BinaryOp::Eq => a == b,
                    BinaryOp::Ne => a != b,
                    _ => return Err(unsupported(rt, op, l)),
                }
            }
            (Operator::Unary(UnaryOp::Not), &[x]) => !boolean(rt, x)?,
            _ => return Err(unsupported(rt, op, operands[0])),
        };
        Ok(Some(Expr::bool(value)))
    }
}

// ── arrays ─────────────────────────────────────────────────────────────

struct ArrayType;

impl NativeType for ArrayType {
    fn resolve_property(
        &self,
        rt: &mut Runtime,
        instance: InstanceId,
        name: &str,
    ) -> Result<Option<Expr>, EvalError> {
        match name {
            "length" => {
                let len = elements(rt, instance)?.len();
                Ok(Some(Expr::int(len as i64)))
            }
            _ => resolve_slot(rt, instance, name),
        }
    }

    /// Out-of-range indices are a confirmed absence, not an error.
    fn resolve_index(
        &self,
        rt: &mut Runtime,
        instance: InstanceId,
        index: InstanceId,
    ) -> Result<Option<Expr>, EvalError> {
        let i = int(rt, index)?;
        let element_ty = rt
            .registry
            .array_element(rt.heap.instance(instance).ty)
            .unwrap_or(TypeId::ANY);
        let items = elements(rt, instance)?;
        let found = usize::try_from(i).ok().and_then(|i| items.get(i));
        Ok(match found {
            None => Some(Expr::missing(element_ty)),
            Some(e) if e.is_terminal() => Some(e.clone()),
            Some(_) => None,
        })
    }

    /// `join(separator)`: waits until the separator and every element are
    /// values.
    fn call_function(
        &self,
        rt: &mut Runtime,
        receiver: InstanceId,
        method: MethodRef,
        args: &[Expr],
    ) -> Result<CallOutcome, EvalError> {
        let name = rt.registry.method(method).name.as_str();
        if name != "join" {
            return Err(EvalError::MissingMethodBody {
                method: name.to_string(),
            });
        }
        let Some(separator) = args.first().and_then(Expr::as_instance) else {
            return Ok(CallOutcome::Deferred);
        };
        let separator = string(rt, separator)?.to_string();

        let mut parts = Vec::new();
        for element in elements(rt, receiver)? {
            match element {
                Expr::Instance(id) => parts.push(
                    rt.scalar_text(*id)
                        .unwrap_or_else(|| rt.type_name(*id)),
                ),
                Expr::Missing { .. } => parts.push(String::new()),
                _ => return Ok(CallOutcome::Deferred),
            }
        }
        Ok(CallOutcome::Produced(Expr::string(parts.join(&separator))))
    }
}

// ── Type ───────────────────────────────────────────────────────────────

struct ReflectedType;

fn reflected(rt: &Runtime, id: InstanceId) -> Result<TypeId, EvalError> {
    match rt.heap.payload(id) {
        NativeValue::Type(t) => Ok(*t),
        _ => Err(invalid(rt, id, "Type")),
    }
}

impl NativeType for ReflectedType {
    fn resolve_property(
        &self,
        rt: &mut Runtime,
        instance: InstanceId,
        name: &str,
    ) -> Result<Option<Expr>, EvalError> {
        match name {
            "name" => {
                let ty = reflected(rt, instance)?;
                Ok(Some(Expr::string(rt.registry.name(ty))))
            }
            _ => resolve_slot(rt, instance, name),
        }
    }

    /// Two reflections are equal when they reflect the same type.
    fn resolve_operator(
        &self,
        rt: &mut Runtime,
        op: Operator,
        operands: &[InstanceId],
    ) -> Result<Option<Expr>, EvalError> {
        match (op, operands) {
            (Operator::Binary(bin @ (BinaryOp::Eq | BinaryOp::Ne)), &[l, r]) => {
                let same = reflected(rt, l)? == reflected(rt, r)?;
                Ok(Some(Expr::bool(same == (bin == BinaryOp::Eq))))
            }
            _ => identity_operator(rt, op, operands),
        }
    }
}
