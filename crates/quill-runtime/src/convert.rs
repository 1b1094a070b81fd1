//! Type conversion between Rust and runtime values
//!
//! Provides the strict [`FromValue`] trait for typed extraction plus the
//! permissive coercions used by scripting functions:
//! - [`to_number`] / [`to_int`] accept numeric strings, honoring the locale's
//!   decimal separator
//! - [`to_date`] accepts dates, epoch milliseconds and RFC 3339 text
//! - [`to_sequence`] normalizes every sequence shape to a `Vec<Value>`
//!
//! Every conversion returns a typed [`CoercionError`] instead of panicking.
//!
//! # Examples
//!
//! ```
//! use quill_runtime::convert::{to_number, FromValue};
//! use quill_runtime::locale::Locale;
//! use quill_runtime::Value;
//!
//! let german = Locale::parse("de_DE").unwrap();
//! assert_eq!(to_number(&Value::from("5,8"), &german).unwrap(), 5.8);
//!
//! let text: String = FromValue::from_value(&Value::from("hello")).unwrap();
//! assert_eq!(text, "hello");
//! ```

use crate::locale::Locale;
use crate::value::{Value, ValueMap};
use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

/// Error type for value conversion failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Cannot parse '{input}' as a number")]
    NotANumber { input: String },

    #[error("Cannot parse '{input}' as a date")]
    InvalidDate { input: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    #[error("Invalid JSON: {0}")]
    Json(String),

    #[error("Invalid encoding: {0}")]
    Encoding(String),

    #[error("Crypto failure: {0}")]
    Crypto(String),
}

fn mismatch(expected: &str, value: &Value) -> CoercionError {
    CoercionError::TypeMismatch {
        expected: expected.to_string(),
        found: value.type_name().to_string(),
    }
}

/// Trait for converting runtime `Value`s to Rust types without coercion
pub trait FromValue: Sized {
    /// # Errors
    ///
    /// Returns `CoercionError::TypeMismatch` when the value has another shape.
    fn from_value(value: &Value) -> Result<Self, CoercionError>;
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, CoercionError> {
        value.as_f64().ok_or_else(|| mismatch("number", value))
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, CoercionError> {
        match value {
            Value::Integer(i) => Ok(*i),
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Ok(*n as i64),
            _ => Err(mismatch("integer", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, CoercionError> {
        match value {
            Value::String(s) => Ok(s.to_string()),
            _ => Err(mismatch("string", value)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, CoercionError> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(mismatch("bool", value)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, CoercionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, CoercionError> {
        let items = to_sequence(value).ok_or_else(|| mismatch("collection", value))?;
        items.iter().map(T::from_value).collect()
    }
}

/// Normalize a list, array or lazy iterable to an ordered vector
///
/// Returns `None` for every other shape.
pub fn to_sequence(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::List(items) => Some(items.as_ref().clone()),
        Value::Array(items) => Some(items.to_vec()),
        Value::Iterable(seq) => Some(seq.iter().collect()),
        _ => None,
    }
}

/// Coerce a value to a floating point number
///
/// Strings are parsed permissively using the locale's separators.
pub fn to_number(value: &Value, locale: &Locale) -> Result<f64, CoercionError> {
    match value {
        Value::Integer(i) => Ok(*i as f64),
        Value::Number(n) => Ok(*n),
        Value::Date(d) => Ok(d.timestamp_millis() as f64),
        Value::String(s) => parse_number_text(s, locale),
        other => Err(CoercionError::NotANumber {
            input: other.to_string(),
        }),
    }
}

/// Parse numeric text such as `"5.8"`, `"1,234.5"` or, for German, `"1.234,5"`
pub fn parse_number_text(text: &str, locale: &Locale) -> Result<f64, CoercionError> {
    let trimmed = text.trim();
    let decimal = locale.decimal_separator();
    let grouping = locale.grouping_separator();

    let normalized: String = if decimal != '.' && trimmed.contains(decimal) {
        trimmed
            .chars()
            .filter(|c| *c != grouping)
            .map(|c| if c == decimal { '.' } else { c })
            .collect()
    } else if decimal == '.' {
        trimmed.chars().filter(|c| *c != grouping).collect()
    } else {
        trimmed.to_string()
    };

    match normalized.parse::<f64>() {
        Ok(n) if n.is_finite() && !normalized.is_empty() => Ok(n),
        _ => Err(CoercionError::NotANumber {
            input: text.to_string(),
        }),
    }
}

/// Coerce a value to an integer, truncating fractional parts
pub fn to_int(value: &Value, locale: &Locale) -> Result<i64, CoercionError> {
    if let Value::String(s) = value {
        if let Ok(i) = s.trim().parse::<i64>() {
            return Ok(i);
        }
    }
    let n = to_number(value, locale)?;
    if n.abs() >= i64::MAX as f64 {
        return Err(CoercionError::NotANumber {
            input: value.to_string(),
        });
    }
    Ok(n.trunc() as i64)
}

/// Coerce a value to a UTC instant
pub fn to_date(value: &Value) -> Result<DateTime<Utc>, CoercionError> {
    let invalid = || CoercionError::InvalidDate {
        input: value.to_string(),
    };
    match value {
        Value::Date(d) => Ok(*d),
        Value::Integer(ms) => Utc.timestamp_millis_opt(*ms).single().ok_or_else(invalid),
        Value::Number(ms) if ms.is_finite() => Utc
            .timestamp_millis_opt(*ms as i64)
            .single()
            .ok_or_else(invalid),
        Value::String(s) => {
            let text = s.trim();
            if let Ok(ms) = text.parse::<i64>() {
                return Utc.timestamp_millis_opt(ms).single().ok_or_else(invalid);
            }
            DateTime::parse_from_rfc3339(text)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

/// Convert a runtime value to JSON
///
/// Dates become RFC 3339 strings and entities become `{"id", "type"}` objects.
pub fn to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(i) => Json::from(*i),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::String(s) => Json::String(s.to_string()),
        Value::List(_) | Value::Array(_) | Value::Iterable(_) => Json::Array(
            to_sequence(value)
                .unwrap_or_default()
                .iter()
                .map(to_json)
                .collect(),
        ),
        Value::Map(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
        Value::Date(d) => Json::String(d.to_rfc3339()),
        Value::Entity(entity) => serde_json::json!({
            "id": entity.id,
            "type": entity.type_name,
        }),
    }
}

/// Convert JSON into a runtime value
///
/// Whole numbers that fit in `i64` become `Integer`, everything else `Number`.
pub fn from_json(json: &serde_json::Value) -> Value {
    use serde_json::Value as Json;
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
        },
        Json::String(s) => Value::string(s.clone()),
        Json::Array(items) => Value::list(items.iter().map(from_json).collect()),
        Json::Object(entries) => {
            let map: ValueMap = entries
                .iter()
                .map(|(k, v)| (k.clone(), from_json(v)))
                .collect();
            Value::map(map)
        }
    }
}
