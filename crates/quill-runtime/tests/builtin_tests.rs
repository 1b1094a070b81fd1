//! End-to-end behavior of the built-in catalog

mod common;

use common::*;
#[allow(unused_imports)]
use common::{assert_eq, assert_ne};
use proptest::prelude::*;
use quill_runtime::{Value, ValueMap};
use rstest::rstest;

// ============================================================================
// Math
// ============================================================================

#[test]
fn test_add() {
    let mut ctx = context();
    assert_eq!(
        eval(&mut ctx, "add", &[Value::Integer(1), Value::Integer(2), Value::Integer(3)]),
        Value::Number(6.0)
    );

    let parse_error = eval(&mut ctx, "add", &[Value::from("x")]);
    assert!(parse_error.as_str().unwrap().contains("Cannot parse 'x'"));
}

#[rstest]
#[case("add", 2)]
#[case("subtract", 2)]
#[case("mult", 2)]
#[case("quot", 2)]
#[case("mod", 2)]
#[case("max", 2)]
#[case("min", 2)]
#[case("round", 1)]
#[case("floor", 1)]
#[case("ceil", 1)]
fn test_null_first_operand_is_null(#[case] name: &str, #[case] arity: usize) {
    let mut ctx = context();
    let mut args = vec![Value::Integer(4); arity];
    args[0] = Value::Null;
    assert_eq!(eval(&mut ctx, name, &args), Value::Null);
}

#[test]
fn test_division_by_zero_is_a_message() {
    let mut ctx = context();
    let result = eval(&mut ctx, "quot", &[Value::Integer(1), Value::Integer(0)]);
    assert_eq!(result, Value::from("Arithmetic error: division by zero"));
}

// ============================================================================
// Logic
// ============================================================================

#[rstest]
#[case(Value::from("true"), Value::from("true"), true)]
#[case(Value::from("true"), Value::Null, false)]
#[case(Value::Null, Value::from("true"), false)]
#[case(Value::Bool(true), Value::Bool(false), false)]
fn test_and(#[case] a: Value, #[case] b: Value, #[case] expected: bool) {
    let mut ctx = context();
    assert_eq!(eval(&mut ctx, "and", &[a, b]), Value::Bool(expected));
}

#[rstest]
#[case(Value::Null, Value::Null, true)]
#[case(Value::Null, Value::Integer(5), false)]
#[case(Value::Integer(5), Value::Integer(5), true)]
#[case(Value::Integer(5), Value::Number(5.0), true)]
#[case(Value::from("5"), Value::Integer(5), true)]
fn test_equal(#[case] a: Value, #[case] b: Value, #[case] expected: bool) {
    let mut ctx = context();
    assert_eq!(eval(&mut ctx, "equal", &[a.clone(), b.clone()]), Value::Bool(expected));
    assert_eq!(eval(&mut ctx, "eq", &[b, a]), Value::Bool(expected));
}

// ============================================================================
// Collections
// ============================================================================

fn with_null() -> Vec<Value> {
    vec![Value::Integer(1), Value::Integer(2), Value::Null, Value::Integer(3)]
}

#[rstest]
#[case(Value::list(with_null()))]
#[case(Value::array(with_null()))]
#[case(Value::Iterable(quill_runtime::value::LazySeq::from_vec(with_null())))]
fn test_size_skips_nulls(#[case] collection: Value) {
    let mut ctx = context();
    assert_eq!(eval(&mut ctx, "size", &[collection]), Value::Integer(3));
}

#[test]
fn test_size_of_null_and_map() {
    let mut ctx = context();
    assert_eq!(eval(&mut ctx, "size", &[Value::Null]), Value::Integer(0));

    let mut map = ValueMap::new();
    map.insert("a".to_string(), Value::Integer(1));
    assert_eq!(eval(&mut ctx, "size", &[Value::map(map)]), Value::Integer(1));
}

// ============================================================================
// Null handling differs per function
// ============================================================================

#[test]
fn test_null_policies() {
    let mut ctx = context();
    assert_eq!(eval(&mut ctx, "upper", &[Value::Null]), Value::from(""));
    assert_eq!(eval(&mut ctx, "int", &[Value::Null]), Value::Null);
    assert_usage(&eval(&mut ctx, "login", &[Value::Null, Value::Null]), "login");
    assert_usage(
        &eval(&mut ctx, "add_labels", &[Value::from("n1"), Value::Null]),
        "add_labels",
    );
}

#[test]
fn test_invalid_regex_is_a_message() {
    let mut ctx = context();
    let result = eval(
        &mut ctx,
        "regex_replace",
        &[Value::from("abc"), Value::from("("), Value::from("x")],
    );
    assert!(result.as_str().unwrap().starts_with("Invalid pattern '('"));
}

// ============================================================================
// Conversion
// ============================================================================

#[test]
fn test_int_of_date_round_trips() {
    let mut ctx = context();
    let date = eval(&mut ctx, "to_date", &[Value::from("1700000000000")]);
    assert!(matches!(date, Value::Date(_)));
    assert_eq!(eval(&mut ctx, "int", &[date]), Value::Integer(1_700_000_000_000));
}

proptest! {
    #[test]
    fn prop_int_to_date_round_trip(millis in 0i64..4_102_444_800_000) {
        let mut ctx = context();
        let date = eval(&mut ctx, "to_date", &[Value::string(millis.to_string())]);
        prop_assert_eq!(eval(&mut ctx, "int", &[date]), Value::Integer(millis));
    }

    #[test]
    fn prop_malformed_numbers_degrade(text in "[a-z]{0,4}x[a-z]{0,4}") {
        let mut ctx = context();
        prop_assert_eq!(eval(&mut ctx, "int", &[Value::string(text.clone())]), Value::Null);
        prop_assert_eq!(eval(&mut ctx, "num", &[Value::string(text.clone())]), Value::Null);
        let date = call(&mut ctx, "to_date", &[Value::string(text)]);
        prop_assert!(matches!(date, Ok(Value::String(_))));
    }
}
