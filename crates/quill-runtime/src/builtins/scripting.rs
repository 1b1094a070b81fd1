//! Context state, error tokens and control flow
//!
//! Everything here reads or writes the [`ActionContext`] of the current
//! evaluation; nothing leaks into other contexts.

use super::{integer, locale, native, optional};
use crate::context::{ActionContext, ErrorToken};
use crate::error::{ArgumentError, RegistryError, RuntimeError};
use crate::function::report;
use crate::function::validate::{require_non_null, require_non_null_at};
use crate::function::{Arity, Category, FunctionDescriptor, NativeFunction};
use crate::value::Value;
use std::time::Duration;

/// Status used by `error()` and by `assert()` for unusable status codes
const DEFAULT_ERROR_STATUS: u16 = 422;

pub fn functions() -> Result<Vec<NativeFunction>, RegistryError> {
    Ok(vec![
        native(
            FunctionDescriptor::new("store", Category::Scripting)
                .arity(Arity::exact(2))
                .signature("key, value")
                .summary("Stores a value in the evaluation-scoped store")
                .description("Storing null removes the key.")
                .example("\"tmp\", 42"),
            |ctx, _, args| {
                require_non_null_at(args, 0)?;
                ctx.store(args[0].to_string(), args[1].clone());
                Ok(Value::Null)
            },
        )?,
        native(
            FunctionDescriptor::new("retrieve", Category::Scripting)
                .arity(Arity::exact(1))
                .signature("key")
                .summary("Returns a value stored earlier in the same evaluation")
                .example("\"tmp\""),
            |ctx, _, args| {
                require_non_null(args)?;
                Ok(ctx.retrieve(&args[0].to_string()).cloned().unwrap_or(Value::Null))
            },
        )?,
        native(
            FunctionDescriptor::new("inc_counter", Category::Scripting)
                .arity(Arity::range(1, 2))
                .signature("level [, resetLowerLevels ]")
                .summary("Increments the counter of a level (0 to 9)")
                .description("With the second argument set to true, every higher level is reset to zero.")
                .example("1, true"),
            |ctx, _, args| {
                require_non_null_at(args, 0)?;
                let level = integer(ctx, &args[0])?;
                let reset = optional(args, 1).is_some_and(Value::is_truthy);
                ctx.increment_counter(level, reset)?;
                Ok(Value::Null)
            },
        )?,
        native(
            FunctionDescriptor::new("get_counter", Category::Scripting)
                .arity(Arity::exact(1))
                .signature("level")
                .summary("Returns the counter of a level")
                .example("1"),
            |ctx, _, args| {
                require_non_null(args)?;
                let level = integer(ctx, &args[0])?;
                Ok(Value::Integer(ctx.counter(level)?))
            },
        )?,
        native(
            FunctionDescriptor::new("reset_counter", Category::Scripting)
                .arity(Arity::exact(1))
                .signature("level")
                .summary("Resets the counter of a level to zero")
                .example("1"),
            |ctx, _, args| {
                require_non_null(args)?;
                let level = integer(ctx, &args[0])?;
                ctx.reset_counter(level)?;
                Ok(Value::Null)
            },
        )?,
        native(
            FunctionDescriptor::new("set_locale", Category::Scripting)
                .arity(Arity::exact(1))
                .signature("locale")
                .summary("Sets the locale used by number parsing and formatting")
                .example("\"de_DE\""),
            |ctx, _, args| {
                require_non_null(args)?;
                let locale = locale(args, 0)?;
                ctx.set_locale(locale);
                Ok(Value::Null)
            },
        )?,
        native(
            FunctionDescriptor::new("get_locale", Category::Scripting)
                .arity(Arity::exact(0))
                .signature("")
                .summary("Returns the current locale"),
            |ctx, _, _| Ok(Value::string(ctx.locale().to_string())),
        )?,
        native(
            FunctionDescriptor::new("error", Category::Scripting)
                .arity(Arity::range(2, 3))
                .signature("property, token [, detail ]")
                .summary("Adds an error token to the error buffer")
                .description("The token's type is the type of the calling entity, if any.")
                .example("\"name\", \"must_not_be_empty\""),
            error,
        )?,
        native(
            FunctionDescriptor::new("get_errors", Category::Scripting)
                .arity(Arity::exact(0))
                .signature("")
                .summary("Returns the error buffer as a list of maps"),
            |ctx, _, _| Ok(Value::list(ctx.errors().iter().map(ErrorToken::to_value).collect())),
        )?,
        native(
            FunctionDescriptor::new("clear_error", Category::Scripting)
                .arity(Arity::range(1, 2))
                .signature("token [, property ]")
                .summary("Removes matching tokens from the error buffer")
                .example("\"must_not_be_empty\", \"name\""),
            |ctx, _, args| {
                require_non_null_at(args, 0)?;
                let property = optional(args, 1).map(Value::to_string);
                let removed = ctx.remove_errors(&args[0].to_string(), property.as_deref());
                tracing::debug!(removed, "error tokens cleared");
                Ok(Value::Null)
            },
        )?,
        native(
            FunctionDescriptor::new("clear_errors", Category::Scripting)
                .arity(Arity::exact(0))
                .signature("")
                .summary("Empties the error buffer"),
            |ctx, _, _| {
                ctx.clear_errors();
                Ok(Value::Null)
            },
        )?,
        native(
            FunctionDescriptor::new("assert", Category::Scripting)
                .arity(Arity::exact(3))
                .signature("condition, statusCode, message")
                .summary("Aborts the evaluation with an error if the condition is false")
                .description(
                    "A failed assertion adds an error token, marks the transaction \
                     rollback-only and stops the evaluation.",
                )
                .example("not(empty(retrieve(\"name\"))), 422, \"Name is required\""),
            assert,
        )?,
        native(
            FunctionDescriptor::new("call", Category::Scripting)
                .arity(Arity::at_least(1))
                .signature("functionName [, arguments... ]")
                .summary("Calls a function by name")
                .example("\"upper\", \"hello\""),
            |ctx, caller, args| {
                require_non_null_at(args, 0)?;
                ctx.call_function(&args[0].to_string(), caller, &args[1..])
            },
        )?,
        native(
            FunctionDescriptor::new("call_privileged", Category::Scripting)
                .arity(Arity::at_least(1))
                .signature("functionName [, arguments... ]")
                .summary("Calls a function by name with superuser rights")
                .description(
                    "The previous principal and grants are restored when the call returns; \
                     flag changes made inside the call persist.",
                )
                .example("\"env\", \"HOME\""),
            |ctx, caller, args| {
                require_non_null_at(args, 0)?;
                let name = args[0].to_string();
                let elevated = ctx.security().elevated();
                ctx.with_security(elevated, |ctx| ctx.call_function(&name, caller, &args[1..]))
            },
        )?,
        native(
            FunctionDescriptor::new("sleep", Category::Scripting)
                .arity(Arity::exact(1))
                .signature("milliseconds")
                .summary("Pauses the evaluation")
                .description("Returns early when the evaluation is cancelled.")
                .example("500"),
            sleep,
        )?,
        native(
            FunctionDescriptor::new("log", Category::Scripting)
                .arity(Arity::at_least(1))
                .signature("values...")
                .summary("Writes the concatenated values to the log")
                .example("\"user: \", me()"),
            |_, caller, args| {
                let message: String = args.iter().map(Value::to_string).collect();
                tracing::info!(target: "quill::script", caller = %caller, "{}", message);
                Ok(Value::Null)
            },
        )?,
    ])
}

fn entity_type(caller: &Value) -> Option<String> {
    match caller {
        Value::Entity(entity) => Some(entity.type_name.clone()),
        _ => None,
    }
}

fn error(ctx: &mut ActionContext, caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null_at(args, 0)?;
    require_non_null_at(args, 1)?;
    let mut token =
        ErrorToken::new(DEFAULT_ERROR_STATUS, args[1].to_string()).with_property(args[0].to_string());
    if let Some(type_name) = entity_type(caller) {
        token = token.with_type(type_name);
    }
    if let Some(detail) = optional(args, 2) {
        token = token.with_detail(detail.to_string());
    }
    report::raise(ctx, token);
    Ok(Value::Null)
}

fn assert(ctx: &mut ActionContext, caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    if args[0].is_truthy() {
        return Ok(Value::Null);
    }
    let status = integer(ctx, &args[1])
        .ok()
        .and_then(|code| u16::try_from(code).ok())
        .filter(|code| (100..=599).contains(code))
        .unwrap_or(DEFAULT_ERROR_STATUS);
    let message = args[2].to_string();

    let mut token = ErrorToken::new(status, message.clone());
    if let Some(type_name) = entity_type(caller) {
        token = token.with_type(type_name);
    }
    report::raise(ctx, token);
    ctx.transaction_mut().mark_rollback_only();
    tracing::warn!(status, message = %message, "assertion failed");
    Err(RuntimeError::AssertionFailed { status, message })
}

fn sleep(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let millis = integer(ctx, &args[0])?;
    let millis = u64::try_from(millis).map_err(|_| ArgumentError::Type {
        index: 0,
        expected: "non-negative milliseconds".to_string(),
        actual: millis.to_string(),
    })?;
    let token = ctx.cancellation().clone();
    if token.wait_timeout(Duration::from_millis(millis)) {
        tracing::debug!(millis, "sleep interrupted by cancellation");
    }
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use crate::builtins::test_support::{call, context, eval};
    use crate::context::CancellationToken;
    use crate::error::RuntimeError;
    use crate::value::{EntityRef, Value};
    use pretty_assertions::assert_eq;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_store_and_retrieve() {
        let mut ctx = context();
        eval(&mut ctx, "store", &[Value::from("k"), Value::Integer(7)]);
        assert_eq!(eval(&mut ctx, "retrieve", &[Value::from("k")]), Value::Integer(7));
        eval(&mut ctx, "store", &[Value::from("k"), Value::Null]);
        assert_eq!(eval(&mut ctx, "retrieve", &[Value::from("k")]), Value::Null);
        assert_eq!(ctx.stored_keys().count(), 0);
    }

    #[test]
    fn test_counters() {
        let mut ctx = context();
        eval(&mut ctx, "inc_counter", &[Value::Integer(1)]);
        eval(&mut ctx, "inc_counter", &[Value::Integer(1)]);
        eval(&mut ctx, "inc_counter", &[Value::Integer(2)]);
        assert_eq!(eval(&mut ctx, "get_counter", &[Value::Integer(1)]), Value::Integer(2));

        eval(&mut ctx, "inc_counter", &[Value::Integer(1), Value::Bool(true)]);
        assert_eq!(eval(&mut ctx, "get_counter", &[Value::Integer(1)]), Value::Integer(3));
        assert_eq!(eval(&mut ctx, "get_counter", &[Value::Integer(2)]), Value::Integer(0));

        eval(&mut ctx, "reset_counter", &[Value::Integer(1)]);
        assert_eq!(eval(&mut ctx, "get_counter", &[Value::Integer(1)]), Value::Integer(0));
    }

    #[test]
    fn test_counter_level_out_of_range_is_usage() {
        let mut ctx = context();
        let result = eval(&mut ctx, "inc_counter", &[Value::Integer(12)]);
        assert!(result.as_str().unwrap().starts_with("Usage: ${inc_counter("));
    }

    #[test]
    fn test_locale_round_trip() {
        let mut ctx = context();
        eval(&mut ctx, "set_locale", &[Value::from("de-de")]);
        assert_eq!(eval(&mut ctx, "get_locale", &[]), Value::from("de_DE"));
        assert_eq!(
            eval(&mut ctx, "num", &[Value::from("5,8")]),
            Value::Number(5.8)
        );
    }

    #[test]
    fn test_error_tokens() {
        let mut ctx = context();
        let user = Value::Entity(EntityRef::new("u1", "User"));
        ctx.call_function("error", &user, &[Value::from("name"), Value::from("must_not_be_empty")])
            .unwrap();
        eval(&mut ctx, "error", &[Value::from("email"), Value::from("must_not_be_empty")]);

        let errors = eval(&mut ctx, "get_errors", &[]);
        assert_eq!(
            errors.to_string(),
            "[{property=name, status=422, token=must_not_be_empty, type=User}, \
             {property=email, status=422, token=must_not_be_empty}]"
        );

        eval(&mut ctx, "clear_error", &[Value::from("must_not_be_empty"), Value::from("name")]);
        assert_eq!(ctx.errors().len(), 1);
        eval(&mut ctx, "clear_errors", &[]);
        assert!(!ctx.has_errors());
    }

    #[test]
    fn test_assert_failure_aborts_and_marks_rollback() {
        let mut ctx = context();
        assert_eq!(
            eval(&mut ctx, "assert", &[Value::Bool(true), Value::Integer(400), Value::from("x")]),
            Value::Null
        );

        let result = call(
            &mut ctx,
            "assert",
            &[Value::Bool(false), Value::Integer(403), Value::from("Forbidden")],
        );
        assert_eq!(
            result,
            Err(RuntimeError::AssertionFailed {
                status: 403,
                message: "Forbidden".to_string()
            })
        );
        assert!(ctx.transaction().is_rollback_only());
        assert_eq!(ctx.errors()[0].status, 403);
    }

    #[test]
    fn test_call_and_call_privileged() {
        let mut ctx = context();
        assert_eq!(
            eval(&mut ctx, "call", &[Value::from("upper"), Value::from("hi")]),
            Value::from("HI")
        );
        assert_eq!(
            call(&mut ctx, "call", &[Value::from("missing")]),
            Err(RuntimeError::UnknownFunction("missing".to_string()))
        );

        let me = eval(&mut ctx, "call_privileged", &[Value::from("me")]);
        assert_eq!(me.to_string(), "{id=00000000000000000000000000000000, name=superuser, superuser=true}");
        assert!(!ctx.security().is_superuser());
    }

    #[test]
    fn test_call_privileged_keeps_flag_changes() {
        let mut ctx = context();
        eval(&mut ctx, "call_privileged", &[Value::from("disable_notifications")]);
        eval(&mut ctx, "call_privileged", &[Value::from("disable_cascading_delete")]);
        assert!(!ctx.security().notifications());
        assert!(!ctx.security().cascading_delete());
        assert!(!ctx.security().is_superuser());
    }

    #[test]
    fn test_sleep_returns_after_timeout() {
        let mut ctx = context();
        let started = Instant::now();
        assert_eq!(eval(&mut ctx, "sleep", &[Value::Integer(10)]), Value::Null);
        assert!(started.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_sleep_is_interrupted_by_cancellation() {
        let mut ctx = context();
        let token = CancellationToken::new();
        ctx.set_cancellation(token.clone());
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            token.cancel();
        });

        let started = Instant::now();
        assert_eq!(eval(&mut ctx, "sleep", &[Value::Integer(60_000)]), Value::Null);
        assert!(started.elapsed() < Duration::from_secs(30));
        handle.join().unwrap();
    }

    #[test]
    fn test_negative_sleep_is_usage() {
        let mut ctx = context();
        let result = eval(&mut ctx, "sleep", &[Value::Integer(-1)]);
        assert!(result.as_str().unwrap().starts_with("Usage: "));
    }
}
