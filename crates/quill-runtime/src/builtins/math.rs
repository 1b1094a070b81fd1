//! Arithmetic functions
//!
//! Arguments are coerced with the context locale, so `"5,8"` is a valid
//! operand in a German evaluation. Results are `Value::Number` except for
//! `rint`, which returns an integer. Unparseable operands surface as the
//! coercion message; null operands follow each function's null policy.

use super::{arg, integer, native, number};
use crate::context::ActionContext;
use crate::convert::CoercionError;
use crate::error::{RegistryError, RuntimeError};
use crate::function::validate::{require_non_null, require_non_null_at};
use crate::function::{Arity, Category, FunctionDescriptor, NativeFunction};
use crate::value::Value;
use rand::RngExt;

pub fn functions() -> Result<Vec<NativeFunction>, RegistryError> {
    Ok(vec![
        native(
            FunctionDescriptor::new("add", Category::Math)
                .arity(Arity::at_least(1))
                .signature("values...")
                .summary("Returns the sum of the given values")
                .description(
                    "Null operands after the first are ignored. A null first operand \
                     makes the whole result null.",
                )
                .param("values", "Numbers or numeric strings")
                .example("1, 2, 3"),
            add,
        )?,
        native(
            FunctionDescriptor::new("subtract", Category::Math)
                .arity(Arity::exact(2))
                .signature("value1, value2")
                .summary("Subtracts the second value from the first")
                .param("value1", "Minuend")
                .param("value2", "Subtrahend")
                .example("5, 2"),
            subtract,
        )?,
        native(
            FunctionDescriptor::new("mult", Category::Math)
                .arity(Arity::at_least(1))
                .signature("values...")
                .summary("Returns the product of the given values")
                .param("values", "Numbers or numeric strings")
                .example("2, 3"),
            mult,
        )?,
        native(
            FunctionDescriptor::new("quot", Category::Math)
                .arity(Arity::exact(2))
                .signature("value1, value2")
                .summary("Divides the first value by the second")
                .param("value1", "Dividend")
                .param("value2", "Divisor, must not be zero")
                .example("10, 4"),
            quot,
        )?,
        native(
            FunctionDescriptor::new("mod", Category::Math)
                .alias("modulo")
                .arity(Arity::exact(2))
                .signature("value1, value2")
                .summary("Returns the remainder of the division of value1 by value2")
                .param("value1", "Dividend")
                .param("value2", "Divisor, must not be zero")
                .example("17, 5"),
            modulo,
        )?,
        native(
            FunctionDescriptor::new("floor", Category::Math)
                .arity(Arity::exact(1))
                .signature("value")
                .summary("Rounds down to the next whole number")
                .param("value", "Number to round")
                .example("2.7"),
            |ctx, _, args| unary(ctx, args, f64::floor),
        )?,
        native(
            FunctionDescriptor::new("ceil", Category::Math)
                .arity(Arity::exact(1))
                .signature("value")
                .summary("Rounds up to the next whole number")
                .param("value", "Number to round")
                .example("2.1"),
            |ctx, _, args| unary(ctx, args, f64::ceil),
        )?,
        native(
            FunctionDescriptor::new("round", Category::Math)
                .arity(Arity::range(1, 2))
                .signature("value [, decimals ]")
                .summary("Rounds to the given number of decimal places")
                .param("value", "Number to round")
                .optional_param("decimals", "Decimal places, default 0")
                .example("3.14159, 2"),
            round,
        )?,
        native(
            FunctionDescriptor::new("max", Category::Math)
                .arity(Arity::exact(2))
                .signature("value1, value2")
                .summary("Returns the larger of two values")
                .example("3, 7"),
            |ctx, _, args| binary(ctx, args, f64::max),
        )?,
        native(
            FunctionDescriptor::new("min", Category::Math)
                .arity(Arity::exact(2))
                .signature("value1, value2")
                .summary("Returns the smaller of two values")
                .example("3, 7"),
            |ctx, _, args| binary(ctx, args, f64::min),
        )?,
        native(
            FunctionDescriptor::new("rint", Category::Math)
                .arity(Arity::exact(1))
                .signature("bound")
                .summary("Returns a random integer in [0, bound)")
                .param("bound", "Exclusive upper bound, must be positive")
                .example("100"),
            rint,
        )?,
    ])
}

// ============================================================================
// Implementations
// ============================================================================

/// Sum or product over every non-null operand after the first
fn fold(
    ctx: &ActionContext,
    args: &[Value],
    init: f64,
    op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    require_non_null_at(args, 0)?;
    let mut acc = init;
    for value in args.iter().filter(|v| !v.is_null()) {
        acc = op(acc, number(ctx, value)?);
    }
    Ok(Value::Number(acc))
}

fn add(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    fold(ctx, args, 0.0, |a, b| a + b)
}

fn mult(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    fold(ctx, args, 1.0, |a, b| a * b)
}

fn binary(
    ctx: &ActionContext,
    args: &[Value],
    op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let a = number(ctx, &args[0])?;
    let b = number(ctx, &args[1])?;
    Ok(Value::Number(op(a, b)))
}

fn unary(ctx: &ActionContext, args: &[Value], op: fn(f64) -> f64) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    Ok(Value::Number(op(number(ctx, &args[0])?)))
}

fn subtract(
    ctx: &mut ActionContext,
    _caller: &Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    binary(ctx, args, |a, b| a - b)
}

fn nonzero_divisor(ctx: &ActionContext, value: &Value) -> Result<f64, RuntimeError> {
    let divisor = number(ctx, value)?;
    if divisor == 0.0 {
        return Err(CoercionError::Arithmetic("division by zero".to_string()).into());
    }
    Ok(divisor)
}

fn quot(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let dividend = number(ctx, &args[0])?;
    let divisor = nonzero_divisor(ctx, &args[1])?;
    Ok(Value::Number(dividend / divisor))
}

fn modulo(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let dividend = number(ctx, &args[0])?;
    let divisor = nonzero_divisor(ctx, &args[1])?;
    Ok(Value::Number(dividend % divisor))
}

fn round(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null_at(args, 0)?;
    let value = number(ctx, &args[0])?;
    let decimals = match arg(args, 1) {
        Value::Null => 0,
        other => integer(ctx, other)?.clamp(0, 15),
    };
    let factor = 10f64.powi(decimals as i32);
    Ok(Value::Number((value * factor).round() / factor))
}

fn rint(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let bound = integer(ctx, &args[0])?;
    if bound <= 0 {
        return Err(CoercionError::Arithmetic(format!("bound must be positive, got {}", bound)).into());
    }
    let mut rng = rand::rng();
    Ok(Value::Integer(rng.random_range(0..bound)))
}

#[cfg(test)]
mod tests {
    use crate::builtins::test_support::{context, eval};
    use crate::value::Value;

    #[test]
    fn test_add_sums_and_skips_trailing_nulls() {
        let mut ctx = context();
        let args = [Value::Integer(1), Value::Integer(2), Value::Integer(3)];
        assert_eq!(eval(&mut ctx, "add", &args), Value::Number(6.0));
        assert_eq!(
            eval(&mut ctx, "add", &[Value::Integer(1), Value::Null, Value::from("2.5")]),
            Value::Number(3.5)
        );
    }

    #[test]
    fn test_add_null_first_is_null() {
        let mut ctx = context();
        assert_eq!(eval(&mut ctx, "add", &[Value::Null, Value::Integer(1)]), Value::Null);
    }

    #[test]
    fn test_add_unparseable_returns_message() {
        let mut ctx = context();
        let result = eval(&mut ctx, "add", &[Value::from("x")]);
        assert_eq!(result, Value::from("Cannot parse 'x' as a number"));
    }

    #[test]
    fn test_division() {
        let mut ctx = context();
        assert_eq!(
            eval(&mut ctx, "quot", &[Value::Integer(10), Value::Integer(4)]),
            Value::Number(2.5)
        );
        assert_eq!(
            eval(&mut ctx, "modulo", &[Value::Integer(17), Value::Integer(5)]),
            Value::Number(2.0)
        );
        let by_zero = eval(&mut ctx, "quot", &[Value::Integer(1), Value::Integer(0)]);
        assert_eq!(by_zero, Value::from("Arithmetic error: division by zero"));
    }

    #[test]
    fn test_rounding() {
        let mut ctx = context();
        assert_eq!(eval(&mut ctx, "floor", &[Value::Number(2.7)]), Value::Number(2.0));
        assert_eq!(eval(&mut ctx, "ceil", &[Value::Number(2.1)]), Value::Number(3.0));
        assert_eq!(
            eval(&mut ctx, "round", &[Value::Number(3.14159), Value::Integer(2)]),
            Value::Number(3.14)
        );
        assert_eq!(eval(&mut ctx, "round", &[Value::Number(2.5)]), Value::Number(3.0));
    }

    #[test]
    fn test_min_max_and_subtract() {
        let mut ctx = context();
        let args = [Value::Integer(3), Value::from("7")];
        assert_eq!(eval(&mut ctx, "max", &args), Value::Number(7.0));
        assert_eq!(eval(&mut ctx, "min", &args), Value::Number(3.0));
        assert_eq!(eval(&mut ctx, "subtract", &args), Value::Number(-4.0));
        assert_eq!(eval(&mut ctx, "subtract", &[Value::Null, Value::Integer(1)]), Value::Null);
    }

    #[test]
    fn test_rint_stays_in_bounds() {
        let mut ctx = context();
        for _ in 0..50 {
            match eval(&mut ctx, "rint", &[Value::Integer(5)]) {
                Value::Integer(n) => assert!((0..5).contains(&n)),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(matches!(
            eval(&mut ctx, "rint", &[Value::Integer(0)]),
            Value::String(_)
        ));
    }
}
