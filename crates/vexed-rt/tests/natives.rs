//! Native plugins and host hooks.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{json, run, this_member};
use vexed_common::InstanceId;
use vexed_rt::{CallOutcome, EvalError, Evaluator, NativeType, NativeValue, Runtime};
use vexed_typeck::{BinaryOp, ClassBuilder, Expr, MethodRef, Param, TypeId, TypeRegistry};

#[derive(Default)]
struct Calls {
    attempts: AtomicUsize,
    produced: AtomicUsize,
}

/// `double(x)`, counting how often it was asked and how often it answered.
struct Doubler(Arc<Calls>);

impl NativeType for Doubler {
    fn call_function(
        &self,
        rt: &mut Runtime,
        _receiver: InstanceId,
        _method: MethodRef,
        args: &[Expr],
    ) -> Result<CallOutcome, EvalError> {
        self.0.attempts.fetch_add(1, Ordering::SeqCst);
        let Some(arg) = args.first().and_then(Expr::as_instance) else {
            return Ok(CallOutcome::Deferred);
        };
        let NativeValue::Int(n) = rt.heap.payload(arg) else {
            return Err(EvalError::InvalidPayload {
                ty: rt.type_name(arg),
                expected: "int",
            });
        };
        self.0.produced.fetch_add(1, Ordering::SeqCst);
        Ok(CallOutcome::Produced(Expr::int(n * 2)))
    }
}

/// `class Source { native double(x: int): int }`
fn declare_source(reg: &mut TypeRegistry) -> TypeId {
    ClassBuilder::declare(reg, "Source")
        .unwrap()
        .native_method("double", vec![Param::new("x", TypeId::INT)], TypeId::INT)
        .finish(reg)
}

fn double(main: TypeId, source: TypeId, arg: Expr) -> Expr {
    Expr::call(
        Expr::member(this_member(main, "s", source), "double", TypeId::ANY),
        vec![arg],
        TypeId::INT,
    )
}

#[tokio::test]
async fn native_calls_defer_until_arguments_reduce() {
    let mut reg = TypeRegistry::new();
    let source = declare_source(&mut reg);
    let builder = ClassBuilder::declare(&mut reg, "Main").unwrap();
    let main = builder.id();
    // `v` is visited first and has to wait for `n`.
    let main = builder
        .property("v", TypeId::INT, double(main, source, this_member(main, "n", TypeId::INT)))
        .property(
            "n",
            TypeId::INT,
            Expr::binary(BinaryOp::Add, Expr::int(1), Expr::int(2), TypeId::INT),
        )
        .property("s", source, Expr::new_instance(source, vec![]))
        .finish(&mut reg);

    let calls = Arc::new(Calls::default());
    let mut ev = Evaluator::new(reg);
    ev.register_native(source, Arc::new(Doubler(calls.clone())));

    let (root, _) = run(&mut ev, main, vec![]).await.unwrap();
    assert_eq!(json(&ev, root), r#"{"v":6,"n":3,"s":{}}"#);
    assert!(calls.attempts.load(Ordering::SeqCst) >= 2);
    assert_eq!(calls.produced.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn each_call_site_runs_once() {
    let mut reg = TypeRegistry::new();
    let source = declare_source(&mut reg);
    let builder = ClassBuilder::declare(&mut reg, "Main").unwrap();
    let main = builder.id();
    let main = builder
        .property("s", source, Expr::new_instance(source, vec![]))
        .property("a", TypeId::INT, double(main, source, Expr::int(5)))
        .property(
            "b",
            TypeId::INT,
            Expr::binary(BinaryOp::Add, this_member(main, "a", TypeId::INT), this_member(main, "a", TypeId::INT), TypeId::INT),
        )
        .finish(&mut reg);

    let calls = Arc::new(Calls::default());
    let mut ev = Evaluator::new(reg);
    ev.register_native(source, Arc::new(Doubler(calls.clone())));

    let (root, _) = run(&mut ev, main, vec![]).await.unwrap();
    assert_eq!(json(&ev, root), r#"{"s":{},"a":10,"b":20}"#);
    assert_eq!(calls.produced.load(Ordering::SeqCst), 1);

    ev.reduce_instance(root).await.unwrap();
    assert_eq!(calls.produced.load(Ordering::SeqCst), 1);
}

/// Answers every native property with a confirmed absence.
struct Absent;

impl NativeType for Absent {
    fn resolve_property(
        &self,
        rt: &mut Runtime,
        instance: InstanceId,
        name: &str,
    ) -> Result<Option<Expr>, EvalError> {
        let ty = rt.heap.instance(instance).ty;
        let prop = rt.registry.find_property(ty, name).map(|(_, p)| p.ty);
        Ok(Some(Expr::missing(prop.unwrap_or(TypeId::ANY))))
    }
}

#[tokio::test]
async fn native_properties_may_be_missing() {
    let mut reg = TypeRegistry::new();
    let lookup = ClassBuilder::declare(&mut reg, "Lookup")
        .unwrap()
        .native_property("value", TypeId::INT)
        .finish(&mut reg);
    let builder = ClassBuilder::declare(&mut reg, "Main").unwrap();
    let main = builder.id();
    let value = || Expr::member(this_member(main, "l", lookup), "value", TypeId::INT);
    let main = builder
        .property("l", lookup, Expr::new_instance(lookup, vec![]))
        .property("v", TypeId::INT, Expr::binary(BinaryOp::Add, value(), Expr::int(1), TypeId::INT))
        .property("w", TypeId::INT, value())
        .finish(&mut reg);

    let mut ev = Evaluator::new(reg);
    ev.register_native(lookup, Arc::new(Absent));
    let (root, _) = run(&mut ev, main, vec![]).await.unwrap();
    assert_eq!(json(&ev, root), r#"{"l":{"value":null},"v":null,"w":null}"#);
}

#[tokio::test]
async fn native_member_hooks_run_once_the_operand_is_an_instance() {
    let mut ev = Evaluator::new(TypeRegistry::new());
    let hook = ev.register_hook(Arc::new(|rt: &mut Runtime, instance: InstanceId| -> Result<Expr, EvalError> {
        let text = rt.scalar_text(instance).unwrap_or_default();
        Ok(Expr::string(format!("<{text}>")))
    }));

    let reg = &mut ev.runtime_mut().registry;
    let builder = ClassBuilder::declare(reg, "Main").unwrap();
    let main = builder.id();
    let main = builder
        .property("n", TypeId::INT, Expr::int(7))
        .property(
            "shown",
            TypeId::STRING,
            Expr::NativeMember {
                operand: Box::new(this_member(main, "n", TypeId::INT)),
                hook,
                ty: TypeId::STRING,
            },
        )
        .finish(reg);

    let (root, _) = run(&mut ev, main, vec![]).await.unwrap();
    assert_eq!(json(&ev, root), r#"{"n":7,"shown":"<7>"}"#);
}
