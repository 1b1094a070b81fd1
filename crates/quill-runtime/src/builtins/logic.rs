//! Boolean logic and comparisons
//!
//! Truthiness is [`Value::is_truthy`]: only `true` and the string `"true"`
//! count, in both dialects.

use super::native;
use crate::context::ActionContext;
use crate::convert;
use crate::error::{RegistryError, RuntimeError};
use crate::function::validate::require_non_null;
use crate::function::{Arity, Category, FunctionDescriptor, NativeFunction};
use crate::locale::Locale;
use crate::value::Value;
use std::cmp::Ordering;

pub fn functions() -> Result<Vec<NativeFunction>, RegistryError> {
    Ok(vec![
        native(
            FunctionDescriptor::new("and", Category::Logic)
                .arity(Arity::at_least(2))
                .signature("bool1, bool2, ...")
                .summary("Returns true if every argument is true")
                .description("A null argument makes the result false without evaluating the rest.")
                .example("true, true"),
            |_, _, args| Ok(Value::Bool(and(args))),
        )?,
        native(
            FunctionDescriptor::new("or", Category::Logic)
                .arity(Arity::at_least(2))
                .signature("bool1, bool2, ...")
                .summary("Returns true if any argument is true")
                .example("false, true"),
            |_, _, args| Ok(Value::Bool(args.iter().any(Value::is_truthy))),
        )?,
        native(
            FunctionDescriptor::new("not", Category::Logic)
                .arity(Arity::exact(1))
                .signature("bool")
                .summary("Negates a boolean; null is treated as false")
                .example("false"),
            |_, _, args| Ok(Value::Bool(!args[0].is_truthy())),
        )?,
        native(
            FunctionDescriptor::new("equal", Category::Logic)
                .alias("eq")
                .arity(Arity::exact(2))
                .signature("value1, value2")
                .summary("Returns true if both values are equal")
                .description(
                    "Two nulls are equal. Numbers compare numerically, so 5 equals \"5.0\".",
                )
                .example("1, \"1\""),
            |ctx, _, args| Ok(Value::Bool(values_equal(&args[0], &args[1], ctx.locale()))),
        )?,
        comparison("lt", "less than", |o| o == Ordering::Less)?,
        comparison("gt", "greater than", |o| o == Ordering::Greater)?,
        comparison("lte", "less than or equal to", |o| o != Ordering::Greater)?,
        comparison("gte", "greater than or equal to", |o| o != Ordering::Less)?,
        native(
            FunctionDescriptor::new("empty", Category::Logic)
                .arity(Arity::exact(1))
                .signature("value")
                .summary("Returns true for null, empty strings, collections and maps")
                .example("\"\""),
            |_, _, args| Ok(Value::Bool(is_empty(&args[0]))),
        )?,
        native(
            FunctionDescriptor::new("if", Category::Logic)
                .arity(Arity::exact(3))
                .signature("condition, trueValue, falseValue")
                .summary("Returns trueValue if the condition is true, falseValue otherwise")
                .example("empty(retrieve(\"name\")), \"anonymous\", retrieve(\"name\")"),
            |_, _, args| {
                let chosen = if args[0].is_truthy() { &args[1] } else { &args[2] };
                Ok(chosen.clone())
            },
        )?,
    ])
}

fn comparison(
    name: &str,
    relation: &str,
    accept: fn(Ordering) -> bool,
) -> Result<NativeFunction, RegistryError> {
    native(
        FunctionDescriptor::new(name, Category::Logic)
            .arity(Arity::exact(2))
            .signature("value1, value2")
            .summary(format!("Returns true if value1 is {} value2", relation))
            .example("1, 2"),
        move |ctx: &mut ActionContext, _: &Value, args: &[Value]| -> Result<Value, RuntimeError> {
            require_non_null(args)?;
            let ordering = compare_values(&args[0], &args[1], ctx.locale());
            Ok(Value::Bool(ordering.is_some_and(accept)))
        },
    )
}

// ============================================================================
// Shared semantics
// ============================================================================

/// Short-circuiting conjunction; null is false
fn and(args: &[Value]) -> bool {
    for value in args {
        if value.is_null() || !value.is_truthy() {
            return false;
        }
    }
    true
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Map(map) => map.is_empty(),
        other => convert::to_sequence(other).is_some_and(|items| items.is_empty()),
    }
}

fn numeric_pair(a: &Value, b: &Value, locale: &Locale) -> Option<(f64, f64)> {
    if !(a.is_numeric() || b.is_numeric()) {
        return None;
    }
    let a = convert::to_number(a, locale).ok()?;
    let b = convert::to_number(b, locale).ok()?;
    Some((a, b))
}

/// Loose equality used by `equal` and `complement`
///
/// Numbers compare numerically against numeric strings, and strings compare
/// against the text form of scalars.
pub(crate) fn values_equal(a: &Value, b: &Value, locale: &Locale) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        _ if a == b => true,
        _ => {
            if let Some((x, y)) = numeric_pair(a, b, locale) {
                return x == y;
            }
            match (a, b) {
                (Value::String(s), other) | (other, Value::String(s)) if !other.is_collection() => {
                    s.as_str() == other.to_string()
                }
                _ => false,
            }
        }
    }
}

/// Ordering used by `lt`, `gt`, `lte` and `gte`
///
/// Dates compare chronologically, numeric pairs numerically, everything
/// else by text. `None` when a side is null.
pub(crate) fn compare_values(a: &Value, b: &Value, locale: &Locale) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        _ => match numeric_pair(a, b, locale) {
            Some((x, y)) => x.partial_cmp(&y),
            None => Some(a.to_string().cmp(&b.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::test_support::{context, eval};
    use rstest::rstest;

    #[rstest]
    #[case(Value::from("true"), Value::from("true"), true)]
    #[case(Value::from("true"), Value::Null, false)]
    #[case(Value::Bool(true), Value::Bool(false), false)]
    #[case(Value::Bool(true), Value::from("yes"), false)]
    fn test_and(#[case] a: Value, #[case] b: Value, #[case] expected: bool) {
        let mut ctx = context();
        assert_eq!(eval(&mut ctx, "and", &[a, b]), Value::Bool(expected));
    }

    #[rstest]
    #[case(Value::Null, Value::Null, true)]
    #[case(Value::Null, Value::Integer(5), false)]
    #[case(Value::Integer(5), Value::Integer(5), true)]
    #[case(Value::Integer(5), Value::from("5.0"), true)]
    #[case(Value::Bool(true), Value::from("true"), true)]
    #[case(Value::from("a"), Value::from("b"), false)]
    fn test_equal(#[case] a: Value, #[case] b: Value, #[case] expected: bool) {
        let mut ctx = context();
        assert_eq!(eval(&mut ctx, "equal", &[a.clone(), b.clone()]), Value::Bool(expected));
        assert_eq!(eval(&mut ctx, "eq", &[b, a]), Value::Bool(expected));
    }

    #[test]
    fn test_or_not_if() {
        let mut ctx = context();
        assert_eq!(
            eval(&mut ctx, "or", &[Value::Null, Value::from("true")]),
            Value::Bool(true)
        );
        assert_eq!(eval(&mut ctx, "not", &[Value::Null]), Value::Bool(true));
        assert_eq!(
            eval(&mut ctx, "if", &[Value::Bool(false), Value::from("a"), Value::from("b")]),
            Value::from("b")
        );
    }

    #[test]
    fn test_comparisons() {
        let mut ctx = context();
        let args = [Value::from("10"), Value::Integer(9)];
        assert_eq!(eval(&mut ctx, "gt", &args), Value::Bool(true));
        assert_eq!(eval(&mut ctx, "lt", &args), Value::Bool(false));
        assert_eq!(
            eval(&mut ctx, "lte", &[Value::Integer(2), Value::Number(2.0)]),
            Value::Bool(true)
        );
        assert_eq!(
            eval(&mut ctx, "lt", &[Value::from("apple"), Value::from("banana")]),
            Value::Bool(true)
        );
        assert_eq!(eval(&mut ctx, "gte", &[Value::Null, Value::Integer(1)]), Value::Null);
    }

    #[test]
    fn test_empty() {
        let mut ctx = context();
        assert_eq!(eval(&mut ctx, "empty", &[Value::Null]), Value::Bool(true));
        assert_eq!(eval(&mut ctx, "empty", &[Value::from("")]), Value::Bool(true));
        assert_eq!(eval(&mut ctx, "empty", &[Value::list(vec![])]), Value::Bool(true));
        assert_eq!(eval(&mut ctx, "empty", &[Value::from(" ")]), Value::Bool(false));
        assert_eq!(eval(&mut ctx, "empty", &[Value::Integer(0)]), Value::Bool(false));
    }
}
