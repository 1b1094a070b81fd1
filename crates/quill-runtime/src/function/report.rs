//! Usage text and diagnostics for malformed calls
//!
//! Nothing here fails: reporting is a sink, the evaluation always continues.

use crate::context::{ActionContext, ErrorToken};
use crate::dialect::Dialect;
use crate::function::descriptor::FunctionDescriptor;
use crate::value::Value;
use std::fmt;

/// Dialect-specific usage string
///
/// Template: `Usage: ${name(signature)}. Example: ${name(example)}`
/// Script:   `Usage: ${{$.name(signature)}}. Example: ${{$.name(example)}}`
pub fn usage(descriptor: &FunctionDescriptor, dialect: Dialect) -> String {
    let name = descriptor.name();
    let mut text = format!(
        "Usage: {}.",
        dialect.render_call(name, descriptor.signature_for(dialect))
    );
    if let Some(example) = descriptor.examples().first() {
        text.push_str(&format!(" Example: {}", dialect.render_call(name, example)));
    }
    text
}

/// Render arguments for diagnostics, e.g. `[1, "x", null]`
pub fn render_arguments(args: &[Value]) -> String {
    let rendered: Vec<String> = args
        .iter()
        .map(|arg| match arg {
            Value::String(s) => format!("{:?}", s.as_str()),
            other => other.to_string(),
        })
        .collect();
    format!("[{}]", rendered.join(", "))
}

/// Record a malformed invocation
pub fn log_parameter_error(
    descriptor: &FunctionDescriptor,
    caller: &Value,
    args: &[Value],
    dialect: Dialect,
) {
    tracing::warn!(
        function = descriptor.name(),
        caller = %caller,
        args = %render_arguments(args),
        dialect = dialect.as_str(),
        "invalid parameters"
    );
}

/// Record a failure that was converted into a diagnostic result
pub fn log_exception(
    descriptor: &FunctionDescriptor,
    caller: &Value,
    args: &[Value],
    error: &dyn fmt::Display,
) {
    tracing::error!(
        function = descriptor.name(),
        caller = %caller,
        args = %render_arguments(args),
        error = %error,
        "function failed"
    );
}

/// Append an error token to the evaluation's error buffer
pub fn raise(ctx: &mut ActionContext, token: ErrorToken) {
    tracing::debug!(status = token.status, token = %token.token, "error token raised");
    ctx.push_error(token);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::descriptor::Category;

    fn add_descriptor() -> FunctionDescriptor {
        FunctionDescriptor::new("add", Category::Math)
            .signature("values...")
            .example("1, 2")
    }

    #[test]
    fn test_template_usage() {
        assert_eq!(
            usage(&add_descriptor(), Dialect::Template),
            "Usage: ${add(values...)}. Example: ${add(1, 2)}"
        );
    }

    #[test]
    fn test_script_usage() {
        assert_eq!(
            usage(&add_descriptor(), Dialect::Script),
            "Usage: ${{$.add(values...)}}. Example: ${{$.add(1, 2)}}"
        );
    }

    #[test]
    fn test_usage_without_example() {
        let d = FunctionDescriptor::new("now", Category::Conversion);
        assert_eq!(usage(&d, Dialect::Template), "Usage: ${now()}.");
    }

    #[test]
    fn test_render_arguments_quotes_strings() {
        let args = [Value::Integer(1), Value::from("x"), Value::Null];
        assert_eq!(render_arguments(&args), "[1, \"x\", null]");
    }
}
