//! Process-wide value cache

use super::{integer, native};
use crate::context::ActionContext;
use crate::error::{ArgumentError, RegistryError, RuntimeError};
use crate::function::validate::{require_non_null, require_non_null_at};
use crate::function::{Arity, Category, FunctionDescriptor, NativeFunction};
use crate::value::Value;
use std::time::Duration;

fn key_fn(name: &str, summary: &str) -> FunctionDescriptor {
    FunctionDescriptor::new(name, Category::Cache)
        .arity(Arity::exact(1))
        .signature("key")
        .summary(summary)
        .example("\"menu\"")
}

pub fn functions() -> Result<Vec<NativeFunction>, RegistryError> {
    Ok(vec![
        native(
            FunctionDescriptor::new("cache", Category::Cache)
                .arity(Arity::exact(3))
                .signature("key, timeout, value")
                .summary("Returns the cached value for key, storing value if there is none")
                .description(
                    "The entry lives for timeout seconds. A negative timeout uses the \
                     configured default.",
                )
                .param("key", "Cache key")
                .param("timeout", "Lifetime in seconds")
                .param("value", "Value to cache on a miss")
                .example("\"menu\", 3600, find(\"MenuItem\")"),
            cache,
        )?,
        native(key_fn("get_cache_value", "Returns a live cached value, or null"), |ctx, _, args| {
            require_non_null(args)?;
            Ok(ctx.services().cache.get(&args[0].to_string()).unwrap_or(Value::Null))
        })?,
        native(key_fn("has_cache_value", "Returns true if a live entry exists"), |ctx, _, args| {
            require_non_null(args)?;
            Ok(Value::Bool(ctx.services().cache.has(&args[0].to_string())))
        })?,
        native(key_fn("delete_cache_value", "Removes a cache entry"), |ctx, _, args| {
            require_non_null(args)?;
            ctx.services().cache.delete(&args[0].to_string());
            Ok(Value::Null)
        })?,
        native(
            key_fn(
                "invalidate_cache_value",
                "Expires a cache entry so the next cache() call recomputes it",
            ),
            |ctx, _, args| {
                require_non_null(args)?;
                ctx.services().cache.invalidate(&args[0].to_string());
                Ok(Value::Null)
            },
        )?,
    ])
}

fn cache(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null_at(args, 0)?;
    let key = args[0].to_string();
    let cache = &ctx.services().cache;
    let ttl = match &args[1] {
        Value::Null => cache.default_timeout(),
        timeout => {
            let seconds = integer(ctx, timeout)?;
            if seconds < 0 {
                cache.default_timeout()
            } else {
                u64::try_from(seconds)
                    .map(Duration::from_secs)
                    .map_err(|_| ArgumentError::Type {
                        index: 1,
                        expected: "timeout in seconds".to_string(),
                        actual: seconds.to_string(),
                    })?
            }
        }
    };
    Ok(cache.get_or_insert(&key, args[2].clone(), ttl))
}
