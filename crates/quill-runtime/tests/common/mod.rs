//! Shared helpers for the runtime integration tests

#![allow(dead_code)]

use quill_runtime::{ActionContext, FunctionRegistry, Licensing, RuntimeError, Services, Value};
use std::sync::Arc;

// Re-export testing utilities
pub use pretty_assertions::{assert_eq, assert_ne};

/// Registry with the full catalog, every module licensed
pub fn registry() -> Arc<FunctionRegistry> {
    Arc::new(FunctionRegistry::with_builtins(Licensing::all()).unwrap())
}

/// Fresh context over the full catalog and default services
pub fn context() -> ActionContext {
    ActionContext::new(registry(), Arc::new(Services::default()))
}

/// Invoke a function without a caller entity
pub fn call(ctx: &mut ActionContext, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    ctx.call_function(name, &Value::Null, args)
}

/// Invoke a function that must not fail past the dispatcher
pub fn eval(ctx: &mut ActionContext, name: &str, args: &[Value]) -> Value {
    match call(ctx, name, args) {
        Ok(value) => value,
        Err(error) => panic!("{}({:?}) failed: {}", name, args, error),
    }
}

/// Assert that a result is usage text for `name`
pub fn assert_usage(result: &Value, name: &str) {
    match result.as_str() {
        Some(text) => assert!(
            text.starts_with(&format!("Usage: ${{{}(", name))
                || text.starts_with(&format!("Usage: ${{{{$.{}(", name)),
            "expected usage for {}, got {:?}",
            name,
            text
        ),
        None => panic!("expected usage for {}, got {:?}", name, result),
    }
}
