//! Generic inference at call sites.

use vexed_common::{Location, Span};
use vexed_typeck::{
    Block, Checker, ClassBuilder, ConstraintOrigin, Expr, Literal, Param, TypeError, TypeId,
    TypeRegistry,
};

fn at(start: u32, end: u32) -> Location {
    Location::detached(Span::new(start, end))
}

/// `class Main { wrap<T>(x: T): T[] { return [x]; } first<T>(xs: T[]): T { return xs[0]; } }`
fn registry() -> (TypeRegistry, TypeId) {
    let mut reg = TypeRegistry::new();
    let wrap_t = reg.create_generic_param("Main.wrap", "T");
    let wrap_ret = reg.create_array_type(wrap_t);
    let first_t = reg.create_generic_param("Main.first", "T");
    let first_param = reg.create_array_type(first_t);
    let pair_t = reg.create_generic_param("Main.pair", "T");

    let main = ClassBuilder::declare(&mut reg, "Main")
        .unwrap()
        .generic_method(
            "wrap",
            vec![wrap_t],
            vec![Param::new("x", wrap_t)],
            wrap_ret,
            Block::returning(
                Expr::Literal(Literal::Array {
                    elements: vec![Expr::param("x", wrap_t)],
                    ty: wrap_ret,
                }),
                wrap_ret,
            ),
        )
        .generic_method(
            "first",
            vec![first_t],
            vec![Param::new("xs", first_param)],
            first_t,
            Block::returning(
                Expr::index(Expr::param("xs", first_param), Expr::int(0), first_t),
                first_t,
            ),
        )
        .generic_method(
            "pair",
            vec![pair_t],
            vec![Param::new("a", pair_t), Param::new("b", pair_t)],
            TypeId::BOOL,
            Block::returning(Expr::bool(true), TypeId::BOOL),
        )
        .finish(&mut reg);
    (reg, main)
}

#[test]
fn inferred_string_gives_string_array() {
    let (mut reg, main) = registry();
    let wrap = reg.find_method(main, "wrap").unwrap();
    let t = reg.method(wrap).generics[0];

    let mut c = Checker::new(&mut reg);
    let call = c.check_call(wrap, &[TypeId::STRING], &at(0, 10));
    assert!(c.errors().is_empty());
    assert_eq!(call.type_args, vec![(t, TypeId::STRING)]);
    assert_eq!(c.registry().name(call.ret), "string[]");
    assert_ne!(call.ret, TypeId::ANY_ARRAY);
}

#[test]
fn infers_element_type_from_array_argument() {
    let (mut reg, main) = registry();
    let first = reg.find_method(main, "first").unwrap();
    let ints = reg.create_array_type(TypeId::INT);

    let mut c = Checker::new(&mut reg);
    let call = c.check_call(first, &[ints], &at(0, 10));
    assert_eq!(call.ret, TypeId::INT);
}

#[test]
fn conflicting_arguments_report_one_mismatch() {
    let (mut reg, main) = registry();
    let pair = reg.find_method(main, "pair").unwrap();

    let mut c = Checker::new(&mut reg);
    let call = c.check_call(pair, &[TypeId::INT, TypeId::STRING], &at(3, 20));
    assert!(c.registry().is_poison(call.ret));
    match c.errors() {
        [TypeError::Mismatch {
            expected,
            found,
            origin: ConstraintOrigin::Argument { index, .. },
        }] => {
            assert_eq!(expected, "int");
            assert_eq!(found, "string");
            assert_eq!(*index, 1);
        }
        other => panic!("expected one argument mismatch, got {:?}", other),
    }
}

#[test]
fn wrong_arity_is_reported() {
    let (mut reg, main) = registry();
    let wrap = reg.find_method(main, "wrap").unwrap();

    let mut c = Checker::new(&mut reg);
    let call = c.check_call(wrap, &[], &at(0, 6));
    assert!(c.registry().is_poison(call.ret));
    assert!(matches!(
        c.errors(),
        [TypeError::ArityMismatch { expected: 1, found: 0, .. }]
    ));
}

#[test]
fn method_member_has_function_type() {
    let (mut reg, main) = registry();
    let mut c = Checker::new(&mut reg);
    let ty = c.check_member(main, "pair", &at(0, 4));
    assert_eq!(c.registry().name(ty), "(T, T) => bool");
}
