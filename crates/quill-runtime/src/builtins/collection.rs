//! Collection functions
//!
//! Lists, arrays and lazy iterables are normalized with
//! [`to_sequence`](crate::convert::to_sequence) before any work, so every
//! function accepts all three shapes. Results are always lists.

use super::logic::values_equal;
use super::{arg, integer, native, optional, sequence};
use crate::context::ActionContext;
use crate::convert;
use crate::error::{RegistryError, RuntimeError};
use crate::function::validate::{require_kinds, require_non_null};
use crate::function::{Arity, Category, FunctionDescriptor, Kind, NativeFunction};
use crate::locale::Locale;
use crate::value::Value;
use std::cmp::Ordering;

pub fn functions() -> Result<Vec<NativeFunction>, RegistryError> {
    Ok(vec![
        native(
            FunctionDescriptor::new("size", Category::Collection)
                .arity(Arity::exact(1))
                .signature("collection")
                .summary("Returns the number of non-null elements of a collection")
                .description("Maps count their entries; null counts as an empty collection.")
                .example("merge(1, 2, 3)"),
            size,
        )?,
        native(
            FunctionDescriptor::new("first", Category::Collection)
                .arity(Arity::exact(1))
                .signature("collection")
                .summary("Returns the first element, or null for an empty collection")
                .example("merge(1, 2, 3)"),
            |_, _, args| {
                require_non_null(args)?;
                Ok(sequence(args, 0)?.into_iter().next().unwrap_or(Value::Null))
            },
        )?,
        native(
            FunctionDescriptor::new("last", Category::Collection)
                .arity(Arity::exact(1))
                .signature("collection")
                .summary("Returns the last element, or null for an empty collection")
                .example("merge(1, 2, 3)"),
            |_, _, args| {
                require_non_null(args)?;
                Ok(sequence(args, 0)?.pop().unwrap_or(Value::Null))
            },
        )?,
        native(
            FunctionDescriptor::new("nth", Category::Collection)
                .arity(Arity::exact(2))
                .signature("collection, index")
                .summary("Returns the element at a zero-based index, or null when out of range")
                .example("merge(1, 2, 3), 1"),
            nth,
        )?,
        native(
            FunctionDescriptor::new("merge", Category::Collection)
                .arity(Arity::at_least(1))
                .signature("values...")
                .summary("Merges collections and single values into one list")
                .description("Null values are skipped.")
                .example("merge(1, 2), 3"),
            |_, _, args| Ok(Value::list(merge(args))),
        )?,
        native(
            FunctionDescriptor::new("unwind", Category::Collection)
                .arity(Arity::at_least(1))
                .signature("collections...")
                .summary("Flattens nested collections by one level")
                .example("merge(merge(1, 2), merge(3))"),
            |_, _, args| Ok(Value::list(unwind(args))),
        )?,
        native(
            FunctionDescriptor::new("sort", Category::Collection)
                .arity(Arity::range(1, 3))
                .signature("collection [, key [, descending ] ]")
                .summary("Sorts a collection, optionally by a property key")
                .description("Elements whose sort value is null are placed last.")
                .optional_param("key", "Property of maps or entities to sort by")
                .optional_param("descending", "true to reverse the order")
                .example("find(\"User\"), \"name\""),
            sort,
        )?,
        native(
            FunctionDescriptor::new("extract", Category::Collection)
                .arity(Arity::exact(2))
                .signature("collection, key")
                .summary("Returns the value of a property for every element")
                .example("find(\"User\"), \"name\""),
            extract,
        )?,
        native(
            FunctionDescriptor::new("complement", Category::Collection)
                .arity(Arity::at_least(1))
                .signature("source, values...")
                .summary("Returns the elements of source that are not among the given values")
                .example("merge(1, 2, 3), 2"),
            complement,
        )?,
        native(
            FunctionDescriptor::new("is_collection", Category::Collection)
                .arity(Arity::exact(1))
                .signature("value")
                .summary("Returns true for lists, arrays and iterables")
                .example("merge(1)"),
            |_, _, args| Ok(Value::Bool(args[0].is_collection())),
        )?,
    ])
}

/// Property of a map or entity; `Value::Null` for anything else
///
/// Graph lookup failures are logged and read as null.
pub(crate) fn property_of(ctx: &ActionContext, element: &Value, key: &str) -> Value {
    match element {
        Value::Map(map) => map.get(key).cloned().unwrap_or(Value::Null),
        Value::Entity(entity) => match ctx.services().graph.get_property(entity, key) {
            Ok(value) => value,
            Err(error) => {
                tracing::debug!(node = %entity.id, key, error = %error, "property lookup failed");
                Value::Null
            }
        },
        _ => Value::Null,
    }
}

// ============================================================================
// Implementations
// ============================================================================

fn size(_ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    let count = match &args[0] {
        Value::Null => 0,
        Value::Map(map) => map.len(),
        _ => sequence(args, 0)?.iter().filter(|v| !v.is_null()).count(),
    };
    Ok(Value::Integer(count as i64))
}

fn nth(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let items = sequence(args, 0)?;
    let index = integer(ctx, &args[1])?;
    Ok(usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i).cloned())
        .unwrap_or(Value::Null))
}

fn merge(args: &[Value]) -> Vec<Value> {
    let mut merged = Vec::new();
    for value in args.iter().filter(|v| !v.is_null()) {
        match convert::to_sequence(value) {
            Some(items) => merged.extend(items.into_iter().filter(|v| !v.is_null())),
            None => merged.push(value.clone()),
        }
    }
    merged
}

fn unwind(args: &[Value]) -> Vec<Value> {
    let mut flat = Vec::new();
    for value in args {
        match convert::to_sequence(value) {
            Some(items) => {
                for item in items {
                    match convert::to_sequence(&item) {
                        Some(nested) => flat.extend(nested),
                        None => flat.push(item),
                    }
                }
            }
            None => flat.push(value.clone()),
        }
    }
    flat
}

fn sort(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_kinds(args, &[Kind::Collection])?;
    let items = sequence(args, 0)?;
    let key = optional(args, 1).map(Value::to_string);
    let descending = arg(args, 2).is_truthy();

    let locale = ctx.locale().clone();
    let mut keyed: Vec<(SortKey, Value)> = items
        .into_iter()
        .map(|item| {
            let sort_value = match &key {
                Some(key) => property_of(ctx, &item, key),
                None => item.clone(),
            };
            (SortKey::of(&sort_value, &locale), item)
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (SortKey::Null, _) | (_, SortKey::Null) => a.cmp(b),
        _ if descending => b.cmp(a),
        _ => a.cmp(b),
    });
    Ok(Value::list(keyed.into_iter().map(|(_, item)| item).collect()))
}

/// Total order over sort values: numbers, then dates, then text, then null
///
/// Numeric strings rank as numbers so `"10"` sorts after `9`.
#[derive(Debug)]
enum SortKey {
    Number(f64),
    Date(i64),
    Text(String),
    Null,
}

impl SortKey {
    fn of(value: &Value, locale: &Locale) -> Self {
        match value {
            Value::Null => SortKey::Null,
            Value::Date(date) => SortKey::Date(date.timestamp_millis()),
            Value::Integer(_) | Value::Number(_) | Value::String(_) => {
                match convert::to_number(value, locale) {
                    Ok(number) if !number.is_nan() => SortKey::Number(number),
                    _ => SortKey::Text(value.to_string()),
                }
            }
            other => SortKey::Text(other.to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Number(_) => 0,
            SortKey::Date(_) => 1,
            SortKey::Text(_) => 2,
            SortKey::Null => 3,
        }
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

fn extract(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let key = args[1].to_string();
    let values = sequence(args, 0)?
        .iter()
        .map(|item| property_of(ctx, item, &key))
        .collect();
    Ok(Value::list(values))
}

fn complement(
    ctx: &mut ActionContext,
    _caller: &Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    require_non_null(&args[..1])?;
    let source = sequence(args, 0)?;
    let removed = merge(&args[1..]);
    let locale = ctx.locale();
    let kept = source
        .into_iter()
        .filter(|item| !removed.iter().any(|r| values_equal(item, r, locale)))
        .collect();
    Ok(Value::list(kept))
}
