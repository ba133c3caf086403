#![allow(dead_code)]

use vexed_common::InstanceId;
use vexed_rt::{EvalError, Evaluator, FormatMode, NativeValue, ReduceStats};
use vexed_typeck::{Expr, TypeId};

pub fn this_member(class: TypeId, name: &str, ty: TypeId) -> Expr {
    Expr::member(Expr::this(class), name, ty)
}

/// `this.<method>(args)`.
pub fn call_this(class: TypeId, method: &str, args: Vec<Expr>, ty: TypeId) -> Expr {
    Expr::call(this_member(class, method, TypeId::ANY), args, ty)
}

pub async fn run(ev: &mut Evaluator, class: TypeId, args: Vec<Expr>) -> Result<(InstanceId, ReduceStats), EvalError> {
    let root = ev.instantiate(class, args)?;
    let stats = ev.reduce_instance(root).await?;
    Ok((root, stats))
}

pub fn json(ev: &Evaluator, root: InstanceId) -> String {
    ev.to_json(root, FormatMode::Strict)
        .expect("graph should be fully reduced")
        .to_string()
}

/// The int stored in a property of `instance`.
pub fn int_property(ev: &Evaluator, instance: InstanceId, name: &str) -> Option<i64> {
    let rt = ev.runtime();
    let slot = rt.heap.instance(instance).property(name)?;
    match rt.heap.payload(slot.expr.as_instance()?) {
        NativeValue::Int(n) => Some(*n),
        _ => None,
    }
}
