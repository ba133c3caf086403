//! End-to-end reduction of script classes.

mod common;

use common::{call_this, int_property, json, run, this_member};
use vexed_rt::{EvalConfig, EvalError, Evaluator, FormatMode, PropertyOrder};
use vexed_typeck::{
    BinaryOp, Block, ClassBuilder, Expr, Literal, Param, Stmt, TypeId, TypeRegistry, UnaryOp,
};

#[tokio::test]
async fn arithmetic_reduces_to_a_sealed_value() {
    let mut reg = TypeRegistry::new();
    let main = ClassBuilder::declare(&mut reg, "Main")
        .unwrap()
        .property(
            "sum",
            TypeId::INT,
            Expr::binary(BinaryOp::Add, Expr::int(2), Expr::int(3), TypeId::INT),
        )
        .finish(&mut reg);

    let mut ev = Evaluator::new(reg);
    let (root, stats) = run(&mut ev, main, vec![]).await.unwrap();
    assert_eq!(json(&ev, root), r#"{"sum":5}"#);
    assert!(ev.runtime().heap.instance(root).sealed);
    assert_eq!(stats.batches, 0);
    // The last sweep found nothing left to do.
    let last = stats.per_sweep.last().unwrap();
    assert_eq!((last.reductions, last.sealed), (0, 0));
}

/// `class Main(n: int) { other = n * 2; v = this.other + 1 }`
/// `class Wrapper { m = new Main(21) }`
fn wrapper_registry() -> (TypeRegistry, TypeId) {
    let mut reg = TypeRegistry::new();
    let builder = ClassBuilder::declare(&mut reg, "Main").unwrap();
    let main = builder.id();
    builder
        .param("n", TypeId::INT)
        .property(
            "other",
            TypeId::INT,
            Expr::binary(BinaryOp::Mul, Expr::param("n", TypeId::INT), Expr::int(2), TypeId::INT),
        )
        .property(
            "v",
            TypeId::INT,
            Expr::binary(
                BinaryOp::Add,
                this_member(main, "other", TypeId::INT),
                Expr::int(1),
                TypeId::INT,
            ),
        )
        .finish(&mut reg);
    let wrapper = ClassBuilder::declare(&mut reg, "Wrapper")
        .unwrap()
        .property("m", main, Expr::new_instance(main, vec![Expr::int(21)]))
        .finish(&mut reg);
    (reg, wrapper)
}

#[tokio::test]
async fn properties_see_constructor_params_and_siblings() {
    let (reg, wrapper) = wrapper_registry();
    let mut ev = Evaluator::new(reg);
    let (root, _) = run(&mut ev, wrapper, vec![]).await.unwrap();
    assert_eq!(json(&ev, root), r#"{"m":{"other":42,"v":43}}"#);

    let text = ev.to_text(root, FormatMode::Strict).unwrap();
    insta::assert_snapshot!(text, @r"
    Wrapper {
      m: Main {
        other: 42
        v: 43
      }
    }
    ");
}

#[tokio::test]
async fn property_order_does_not_change_the_result() {
    let mut results = Vec::new();
    for order in [PropertyOrder::Declared, PropertyOrder::Reverse] {
        let (reg, wrapper) = wrapper_registry();
        let config = EvalConfig {
            property_order: order,
            ..EvalConfig::default()
        };
        let mut ev = Evaluator::with_config(reg, config);
        let (root, _) = run(&mut ev, wrapper, vec![]).await.unwrap();
        results.push(json(&ev, root));
    }
    assert_eq!(results[0], results[1]);
}

#[tokio::test]
async fn subclasses_pass_arguments_to_their_parent() {
    let mut reg = TypeRegistry::new();
    let base = ClassBuilder::declare(&mut reg, "Base")
        .unwrap()
        .param("name", TypeId::STRING)
        .property(
            "greeting",
            TypeId::STRING,
            Expr::binary(
                BinaryOp::Add,
                Expr::string("hello "),
                Expr::param("name", TypeId::STRING),
                TypeId::STRING,
            ),
        )
        .finish(&mut reg);
    let derived = ClassBuilder::declare(&mut reg, "Derived")
        .unwrap()
        .extends(
            base,
            vec![Expr::binary(
                BinaryOp::Add,
                Expr::param("first", TypeId::STRING),
                Expr::string("!"),
                TypeId::STRING,
            )],
        )
        .param("first", TypeId::STRING)
        .property("len", TypeId::INT, Expr::member(Expr::param("first", TypeId::STRING), "length", TypeId::INT))
        .finish(&mut reg);

    let mut ev = Evaluator::new(reg);
    let (root, _) = run(&mut ev, derived, vec![Expr::string("vex")]).await.unwrap();
    assert_eq!(json(&ev, root), r#"{"greeting":"hello vex!","len":3}"#);
}

#[tokio::test]
async fn generic_methods_build_arrays_of_the_inferred_type() {
    let mut reg = TypeRegistry::new();
    let t = reg.create_generic_param("Main.wrap", "T");
    let t_array = reg.create_array_type(t);
    let strings = reg.create_array_type(TypeId::STRING);

    let builder = ClassBuilder::declare(&mut reg, "Main").unwrap();
    let main = builder.id();
    let main = builder
        .generic_method(
            "wrap",
            vec![t],
            vec![Param::new("x", t)],
            t_array,
            Block::returning(
                Expr::Literal(Literal::Array {
                    elements: vec![Expr::param("x", t)],
                    ty: t_array,
                }),
                t_array,
            ),
        )
        .property(
            "items",
            strings,
            Expr::Call {
                callee: Box::new(this_member(main, "wrap", TypeId::ANY)),
                args: vec![Expr::string("a")],
                type_args: vec![(t, TypeId::STRING)],
                ty: strings,
            },
        )
        .finish(&mut reg);

    let mut ev = Evaluator::new(reg);
    let (root, _) = run(&mut ev, main, vec![]).await.unwrap();
    assert_eq!(json(&ev, root), r#"{"items":["a"]}"#);

    let rt = ev.runtime();
    let items = rt.heap.instance(root).property("items").unwrap().expr.as_instance().unwrap();
    assert_eq!(rt.type_name(items), "string[]");
    assert!(rt.heap.instance(items).sealed);
}

#[tokio::test]
async fn generic_arguments_survive_a_stalled_inner_call() {
    let mut reg = TypeRegistry::new();
    let t = reg.create_generic_param("Main.outer", "T");
    let u = reg.create_generic_param("Main.inner", "U");
    let (t_array, u_array) = (reg.create_array_type(t), reg.create_array_type(u));
    let strings = reg.create_array_type(TypeId::STRING);

    let builder = ClassBuilder::declare(&mut reg, "Main").unwrap();
    let main = builder.id();
    // `h0` only resolves after walking a chain of properties, so the inner
    // call in `outer` waits for its receiver for several sweeps.
    let mut builder = builder;
    for i in 0..7 {
        builder = builder.private_property(&format!("h{i}"), main, this_member(main, &format!("h{}", i + 1), main));
    }
    let main = builder
        .private_property("h7", main, Expr::this(main))
        .generic_method(
            "inner",
            vec![u],
            vec![Param::new("y", u)],
            u_array,
            Block::returning(
                Expr::Literal(Literal::Array {
                    elements: vec![Expr::param("y", u)],
                    ty: u_array,
                }),
                u_array,
            ),
        )
        .generic_method(
            "outer",
            vec![t],
            vec![Param::new("x", t)],
            t_array,
            Block::returning(
                Expr::Call {
                    callee: Box::new(Expr::member(this_member(main, "h0", main), "inner", TypeId::ANY)),
                    args: vec![Expr::param("x", t)],
                    type_args: vec![(u, t)],
                    ty: t_array,
                },
                t_array,
            ),
        )
        .property(
            "items",
            strings,
            Expr::Call {
                callee: Box::new(this_member(main, "outer", TypeId::ANY)),
                args: vec![Expr::string("a")],
                type_args: vec![(t, TypeId::STRING)],
                ty: strings,
            },
        )
        .finish(&mut reg);

    let mut ev = Evaluator::new(reg);
    let (root, _) = run(&mut ev, main, vec![]).await.unwrap();
    assert_eq!(json(&ev, root), r#"{"items":["a"]}"#);

    let rt = ev.runtime();
    let items = rt.heap.instance(root).property("items").unwrap().expr.as_instance().unwrap();
    assert_eq!(rt.type_name(items), "string[]");
}

#[tokio::test]
async fn omitted_generic_arguments_are_missing_of_the_bound_type() {
    let mut reg = TypeRegistry::new();
    let t = reg.create_generic_param("Main.pick", "T");
    let builder = ClassBuilder::declare(&mut reg, "Main").unwrap();
    let main = builder.id();
    let main = builder
        .generic_method(
            "pick",
            vec![t],
            vec![Param::new("x", t)],
            t,
            Block::returning(Expr::param("x", t), t),
        )
        .property(
            "v",
            TypeId::STRING,
            Expr::Call {
                callee: Box::new(this_member(main, "pick", TypeId::ANY)),
                args: vec![],
                type_args: vec![(t, TypeId::STRING)],
                ty: TypeId::STRING,
            },
        )
        .finish(&mut reg);

    let mut ev = Evaluator::new(reg);
    let (root, _) = run(&mut ev, main, vec![]).await.unwrap();
    assert_eq!(json(&ev, root), r#"{"v":null}"#);
    let slot = ev.runtime().heap.instance(root).property("v").unwrap();
    assert_eq!(slot.expr, Expr::missing(TypeId::STRING));
}

#[tokio::test]
async fn locals_assignments_and_branches() {
    let mut reg = TypeRegistry::new();
    let builder = ClassBuilder::declare(&mut reg, "Main").unwrap();
    let main = builder.id();
    let body = Block::new(
        vec![
            Stmt::LocalDecl {
                name: "n".into(),
                ty: TypeId::INT,
                init: Expr::int(0),
            },
            Stmt::If {
                cond: Expr::param("flag", TypeId::BOOL),
                then_branch: vec![Stmt::LocalAssign {
                    name: "n".into(),
                    value: Expr::binary(BinaryOp::Add, Expr::int(20), Expr::int(2), TypeId::INT),
                }],
                else_branch: vec![],
            },
            Stmt::Return(Expr::var("n", TypeId::INT)),
        ],
        TypeId::INT,
    );
    let main = builder
        .method("calc", vec![Param::new("flag", TypeId::BOOL)], TypeId::INT, body)
        .property("a", TypeId::INT, call_this(main, "calc", vec![Expr::bool(true)], TypeId::INT))
        .property("b", TypeId::INT, call_this(main, "calc", vec![Expr::bool(false)], TypeId::INT))
        .finish(&mut reg);

    let mut ev = Evaluator::new(reg);
    let (root, _) = run(&mut ev, main, vec![]).await.unwrap();
    assert_eq!(int_property(&ev, root, "a"), Some(22));
    assert_eq!(int_property(&ev, root, "b"), Some(0));
}

#[tokio::test]
async fn empty_bodies_return_missing() {
    let mut reg = TypeRegistry::new();
    let builder = ClassBuilder::declare(&mut reg, "Main").unwrap();
    let main = builder.id();
    let main = builder
        .method("nothing", vec![], TypeId::INT, Block::new(vec![], TypeId::INT))
        .property("x", TypeId::INT, call_this(main, "nothing", vec![], TypeId::INT))
        .finish(&mut reg);

    let mut ev = Evaluator::new(reg);
    let (root, _) = run(&mut ev, main, vec![]).await.unwrap();
    assert_eq!(json(&ev, root), r#"{"x":null}"#);
}

#[tokio::test]
async fn missing_arguments_propagate_through_member_access() {
    let mut reg = TypeRegistry::new();
    let point = ClassBuilder::declare(&mut reg, "Point")
        .unwrap()
        .property("x", TypeId::INT, Expr::int(1))
        .finish(&mut reg);
    let main = ClassBuilder::declare(&mut reg, "Main")
        .unwrap()
        .param("p", point)
        .property("x", TypeId::INT, Expr::member(Expr::param("p", point), "x", TypeId::INT))
        .property(
            "y",
            TypeId::INT,
            Expr::binary(
                BinaryOp::Add,
                Expr::member(Expr::param("p", point), "x", TypeId::INT),
                Expr::int(1),
                TypeId::INT,
            ),
        )
        .finish(&mut reg);

    let mut ev = Evaluator::new(reg);
    let (root, _) = run(&mut ev, main, vec![]).await.unwrap();
    assert_eq!(json(&ev, root), r#"{"x":null,"y":null}"#);
}

#[tokio::test]
async fn typeof_reflects_without_evaluating() {
    let mut reg = TypeRegistry::new();
    let main = ClassBuilder::declare(&mut reg, "Main")
        .unwrap()
        .property(
            "t",
            TypeId::TYPE,
            Expr::unary(
                UnaryOp::TypeOf,
                Expr::binary(BinaryOp::Div, Expr::int(1), Expr::int(0), TypeId::INT),
                TypeId::TYPE,
            ),
        )
        .finish(&mut reg);

    let mut ev = Evaluator::new(reg);
    let (root, _) = run(&mut ev, main, vec![]).await.unwrap();
    assert_eq!(json(&ev, root), r#"{"t":"int"}"#);
}

#[tokio::test]
async fn to_string_goes_through_the_host_hook() {
    let mut reg = TypeRegistry::new();
    let main = ClassBuilder::declare(&mut reg, "Main")
        .unwrap()
        .property(
            "s",
            TypeId::STRING,
            Expr::call(
                Expr::member(
                    Expr::binary(BinaryOp::Add, Expr::int(40), Expr::int(2), TypeId::INT),
                    "toString",
                    TypeId::ANY,
                ),
                vec![],
                TypeId::STRING,
            ),
        )
        .finish(&mut reg);

    let mut ev = Evaluator::new(reg);
    let (root, _) = run(&mut ev, main, vec![]).await.unwrap();
    assert_eq!(json(&ev, root), r#"{"s":"42"}"#);
}

#[tokio::test]
async fn arrays_index_and_join() {
    let mut reg = TypeRegistry::new();
    let ints = reg.create_array_type(TypeId::INT);
    let builder = ClassBuilder::declare(&mut reg, "Main").unwrap();
    let main = builder.id();
    let main = builder
        .property("xs", ints, Expr::array(vec![Expr::int(1), Expr::int(2)], ints))
        .property(
            "second",
            TypeId::INT,
            Expr::index(this_member(main, "xs", ints), Expr::int(1), TypeId::INT),
        )
        .property(
            "past_end",
            TypeId::INT,
            Expr::index(this_member(main, "xs", ints), Expr::int(5), TypeId::INT),
        )
        .property(
            "joined",
            TypeId::STRING,
            Expr::call(
                Expr::member(this_member(main, "xs", ints), "join", TypeId::ANY),
                vec![Expr::string(", ")],
                TypeId::STRING,
            ),
        )
        .property(
            "count",
            TypeId::INT,
            Expr::member(this_member(main, "xs", ints), "length", TypeId::INT),
        )
        .finish(&mut reg);

    let mut ev = Evaluator::new(reg);
    let (root, _) = run(&mut ev, main, vec![]).await.unwrap();
    assert_eq!(
        json(&ev, root),
        r#"{"xs":[1,2],"second":2,"past_end":null,"joined":"1, 2","count":2}"#
    );
}

#[tokio::test]
async fn mismatched_operands_abort_evaluation() {
    let mut reg = TypeRegistry::new();
    let main = ClassBuilder::declare(&mut reg, "Main")
        .unwrap()
        .property(
            "bad",
            TypeId::INT,
            Expr::binary(BinaryOp::Add, Expr::int(1), Expr::string("a"), TypeId::INT),
        )
        .finish(&mut reg);

    let mut ev = Evaluator::new(reg);
    let err = run(&mut ev, main, vec![]).await.unwrap_err();
    assert_eq!(
        err,
        EvalError::OperandTypeMismatch {
            op: "+".into(),
            lhs: "int".into(),
            rhs: "string".into(),
        }
    );
}

#[tokio::test]
async fn integer_division_by_zero_is_fatal() {
    let mut reg = TypeRegistry::new();
    let main = ClassBuilder::declare(&mut reg, "Main")
        .unwrap()
        .property(
            "d",
            TypeId::INT,
            Expr::binary(BinaryOp::Div, Expr::int(1), Expr::int(0), TypeId::INT),
        )
        .finish(&mut reg);

    let mut ev = Evaluator::new(reg);
    let err = run(&mut ev, main, vec![]).await.unwrap_err();
    assert_eq!(err, EvalError::DivisionByZero);
}
