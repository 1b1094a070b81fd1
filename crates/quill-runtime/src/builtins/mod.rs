//! Built-in function catalog
//!
//! Each category module exposes `functions()`, returning its natives in
//! documentation order. [`register_all`] installs every category into a
//! registry; licensing is applied by the registry itself.

pub mod cache;
pub mod collection;
pub mod conversion;
pub mod database;
pub mod logic;
pub mod math;
pub mod scripting;
pub mod security;
pub mod string;
pub mod system;

use crate::context::ActionContext;
use crate::convert::{self, CoercionError};
use crate::error::{ArgumentError, RegistryError, RuntimeError};
use crate::function::{FunctionBuilder, FunctionDescriptor, FunctionRegistry, NativeFunction};
use crate::locale::Locale;
use crate::value::{EntityRef, Value};

/// Register the whole catalog
///
/// # Errors
///
/// `RegistryError::Duplicate` if two built-ins claim the same name, or if
/// the registry already holds one of the names.
pub fn register_all(registry: &mut FunctionRegistry) -> Result<(), RegistryError> {
    let groups = [
        math::functions()?,
        conversion::functions()?,
        logic::functions()?,
        string::functions()?,
        collection::functions()?,
        scripting::functions()?,
        security::functions()?,
        system::functions()?,
        cache::functions()?,
        database::functions()?,
    ];
    for function in groups.into_iter().flatten() {
        registry.register(function)?;
    }
    tracing::debug!(functions = registry.len(), "built-in catalog registered");
    Ok(())
}

/// Shorthand for `FunctionBuilder::new(..).with_implementation(..).build()`
pub(crate) fn native<F>(descriptor: FunctionDescriptor, body: F) -> Result<NativeFunction, RegistryError>
where
    F: Fn(&mut ActionContext, &Value, &[Value]) -> Result<Value, RuntimeError>
        + Send
        + Sync
        + 'static,
{
    FunctionBuilder::new(descriptor)
        .with_implementation(body)
        .build()
}

// ============================================================================
// Argument helpers shared by the categories
// ============================================================================

/// Argument at `index`, or `Value::Null` when absent
pub(crate) fn arg(args: &[Value], index: usize) -> &Value {
    static NULL: Value = Value::Null;
    args.get(index).unwrap_or(&NULL)
}

/// Non-null argument at `index`, if any
pub(crate) fn optional(args: &[Value], index: usize) -> Option<&Value> {
    args.get(index).filter(|value| !value.is_null())
}

/// Locale-aware number coercion of a single argument
pub(crate) fn number(ctx: &ActionContext, value: &Value) -> Result<f64, CoercionError> {
    convert::to_number(value, ctx.locale())
}

pub(crate) fn integer(ctx: &ActionContext, value: &Value) -> Result<i64, CoercionError> {
    convert::to_int(value, ctx.locale())
}

/// Elements of a sequence argument; any other shape is a type error
pub(crate) fn sequence(args: &[Value], index: usize) -> Result<Vec<Value>, ArgumentError> {
    let value = arg(args, index);
    convert::to_sequence(value).ok_or_else(|| ArgumentError::Type {
        index,
        expected: "collection".to_string(),
        actual: value.type_name().to_string(),
    })
}

/// Locale tag argument such as `de_DE`
pub(crate) fn locale(args: &[Value], index: usize) -> Result<Locale, ArgumentError> {
    let value = arg(args, index);
    value
        .as_str()
        .and_then(Locale::parse)
        .ok_or_else(|| ArgumentError::Type {
            index,
            expected: "locale tag".to_string(),
            actual: value.to_string(),
        })
}

/// Resolve an entity argument
///
/// Entities are used as-is; strings are looked up as node ids.
pub(crate) fn entity(
    ctx: &ActionContext,
    args: &[Value],
    index: usize,
) -> Result<EntityRef, RuntimeError> {
    match arg(args, index) {
        Value::Entity(entity) => Ok(entity.clone()),
        Value::String(id) => Ok(ctx.services().graph.get_node(id)?),
        Value::Null => Err(ArgumentError::Null { index }.into()),
        other => Err(ArgumentError::Type {
            index,
            expected: "entity".to_string(),
            actual: other.type_name().to_string(),
        }
        .into()),
    }
}

/// Flatten string and collection arguments into a list of names
///
/// A string may hold several names separated by commas or whitespace.
pub(crate) fn names(value: &Value) -> Vec<String> {
    let split = |text: &str| -> Vec<String> {
        text.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    };
    match convert::to_sequence(value) {
        Some(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .flat_map(|item| split(&item.to_string()))
            .collect(),
        None if value.is_null() => Vec::new(),
        None => split(&value.to_string()),
    }
}
