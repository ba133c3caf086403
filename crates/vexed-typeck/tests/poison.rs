//! Poison containment: one malformed declaration, one diagnostic.

use vexed_common::{Location, Span};
use vexed_typeck::unify::{is_type_assignable, GenericBindings};
use vexed_typeck::{BinaryOp, Checker, ConstraintOrigin, TypeError, TypeId, TypeRegistry, UnaryOp};

fn at(start: u32, end: u32) -> Location {
    Location::new("main.vx", Span::new(start, end))
}

#[test]
fn unknown_type_reports_once_regardless_of_use_count() {
    let mut reg = TypeRegistry::new();
    let mut c = Checker::new(&mut reg);
    let p = c.resolve_type_name("Strng", &at(10, 15));

    for i in 0..8 {
        let site = at(20 + i, 21 + i);
        let len = c.check_member(p, "length", &site);
        let sum = c.check_binary(BinaryOp::Add, p, TypeId::STRING, &site);
        let neg = c.check_unary(UnaryOp::Not, sum, &site);
        c.check_assignment(
            len,
            TypeId::INT,
            ConstraintOrigin::Initializer {
                property: format!("p{i}"),
                loc: site.clone(),
            },
        );
        c.check_return(neg, TypeId::BOOL, &site);
    }

    assert!(c.registry().is_poison(p));
    assert!(matches!(
        c.errors(),
        [TypeError::UnknownType { name, .. }] if name == "Strng"
    ));
}

#[test]
fn each_error_site_gets_its_own_poison() {
    let mut reg = TypeRegistry::new();
    let mut c = Checker::new(&mut reg);
    let a = c.resolve_type_name("Nope", &at(0, 4));
    let b = c.resolve_type_name("Nada", &at(6, 10));
    assert_ne!(a, b);
    assert_eq!(c.errors().len(), 2);
    assert_eq!(c.registry().poison_count(), 2);
}

#[test]
fn poisoned_array_shape_stays_silent() {
    let mut reg = TypeRegistry::new();
    let mut c = Checker::new(&mut reg);
    let arr = c.resolve_type_name("Strng[][]", &at(0, 9));
    assert_eq!(c.errors().len(), 1);
    assert!(!c.registry().is_poison(arr));
    assert!(c.registry().contains_poison(arr));

    // `length` still resolves through `any[]`.
    assert_eq!(c.check_member(arr, "length", &at(12, 18)), TypeId::INT);
    // An unknown member on a poisoned shape is not a second error.
    let m = c.check_member(arr, "frobnicate", &at(20, 30));
    assert!(c.registry().is_poison(m));

    let ints = c.registry_mut().create_array_type(TypeId::INT);
    c.check_assignment(arr, ints, ConstraintOrigin::Assignment { loc: at(31, 40) });
    c.check_binary(BinaryOp::Add, arr, TypeId::INT, &at(41, 50));
    assert_eq!(c.errors().len(), 1);
}

#[test]
fn poison_nested_in_function_shapes_is_assignable() {
    let mut reg = TypeRegistry::new();
    let p = reg.new_poison();

    // (int) => <error>  flows into  (int) => string
    let poisoned_ret = reg.create_function_type(p, &[TypeId::INT]);
    let target = reg.create_function_type(TypeId::STRING, &[TypeId::INT]);
    assert!(is_type_assignable(&reg, poisoned_ret, target, &mut GenericBindings::empty()));

    // ((<error>) => int)[]  flows into  ((bool) => int)[]
    let poisoned_param = reg.create_function_type(TypeId::INT, &[p]);
    let source = reg.create_array_type(poisoned_param);
    let clean = reg.create_function_type(TypeId::INT, &[TypeId::BOOL]);
    let target = reg.create_array_type(clean);
    assert!(is_type_assignable(&reg, source, target, &mut GenericBindings::empty()));
    assert!(is_type_assignable(&reg, target, source, &mut GenericBindings::empty()));
}

#[test]
fn poison_binds_generics_without_conflict() {
    let mut reg = TypeRegistry::new();
    let t = reg.create_generic_param("Main.pair", "T");
    let p = reg.new_poison();

    // T bound to poison first, then a concrete argument: still fine.
    let mut b = GenericBindings::for_params(&[t]);
    assert!(is_type_assignable(&reg, p, t, &mut b));
    assert!(is_type_assignable(&reg, TypeId::INT, t, &mut b));

    // T bound to int first, then a poisoned argument: still fine.
    let mut b = GenericBindings::for_params(&[t]);
    assert!(is_type_assignable(&reg, TypeId::INT, t, &mut b));
    assert!(is_type_assignable(&reg, p, t, &mut b));
    assert_eq!(b.get(t), Some(TypeId::INT));
}

#[test]
fn poisoned_call_argument_is_skipped() {
    use vexed_typeck::{Block, ClassBuilder, Expr, Param};

    let mut reg = TypeRegistry::new();
    let main = ClassBuilder::declare(&mut reg, "Main")
        .unwrap()
        .method(
            "greet",
            vec![Param::new("name", TypeId::STRING), Param::new("times", TypeId::INT)],
            TypeId::STRING,
            Block::returning(Expr::param("name", TypeId::STRING), TypeId::STRING),
        )
        .finish(&mut reg);
    let greet = reg.find_method(main, "greet").unwrap();

    let mut c = Checker::new(&mut reg);
    let bad = c.resolve_type_name("Strng", &at(0, 5));
    let call = c.check_call(greet, &[bad, TypeId::INT], &at(10, 30));
    assert_eq!(call.ret, TypeId::STRING);
    assert_eq!(c.errors().len(), 1);
}
