//! Argument validation
//!
//! Arity is always checked before nullness, so a call that is both short and
//! contains nulls reports [`ArgumentError::Count`].

use crate::error::ArgumentError;
use crate::function::descriptor::Arity;
use crate::value::Value;
use std::fmt;

/// Expected shape of a positional argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Any,
    /// `Integer` or `Number`
    Number,
    String,
    Bool,
    /// `List`, `Array` or `Iterable`
    Collection,
    Map,
    Date,
    Entity,
}

impl Kind {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Kind::Any => true,
            Kind::Number => value.is_numeric(),
            Kind::String => matches!(value, Value::String(_)),
            Kind::Bool => matches!(value, Value::Bool(_)),
            Kind::Collection => value.is_collection(),
            Kind::Map => matches!(value, Value::Map(_)),
            Kind::Date => matches!(value, Value::Date(_)),
            Kind::Entity => matches!(value, Value::Entity(_)),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Any => "any",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Bool => "bool",
            Kind::Collection => "collection",
            Kind::Map => "map",
            Kind::Date => "date",
            Kind::Entity => "entity",
        };
        f.write_str(name)
    }
}

/// Check the argument count against `arity`
pub fn check_arity(args: &[Value], arity: Arity) -> Result<(), ArgumentError> {
    if arity.accepts(args.len()) {
        Ok(())
    } else {
        Err(ArgumentError::Count {
            expected: arity.to_string(),
            actual: args.len(),
        })
    }
}

/// Every argument must be non-null
pub fn require_non_null(args: &[Value]) -> Result<(), ArgumentError> {
    match args.iter().position(Value::is_null) {
        Some(index) => Err(ArgumentError::Null { index }),
        None => Ok(()),
    }
}

/// The argument at `index` must be present and non-null
pub fn require_non_null_at(args: &[Value], index: usize) -> Result<(), ArgumentError> {
    match args.get(index) {
        Some(value) if !value.is_null() => Ok(()),
        _ => Err(ArgumentError::Null { index }),
    }
}

/// Positional kind check; extra arguments beyond `kinds` are not checked
///
/// A null at a typed position reports `Null`, not `Type`.
pub fn require_kinds(args: &[Value], kinds: &[Kind]) -> Result<(), ArgumentError> {
    for (index, (value, kind)) in args.iter().zip(kinds).enumerate() {
        if *kind == Kind::Any {
            continue;
        }
        if value.is_null() {
            return Err(ArgumentError::Null { index });
        }
        if !kind.matches(value) {
            return Err(ArgumentError::Type {
                index,
                expected: kind.to_string(),
                actual: value.type_name().to_string(),
            });
        }
    }
    Ok(())
}

/// Arity first, then (optionally) nullness of every argument
pub fn assert_arguments(
    args: &[Value],
    arity: Arity,
    all_non_null: bool,
) -> Result<(), ArgumentError> {
    check_arity(args, arity)?;
    if all_non_null {
        require_non_null(args)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_before_null() {
        let args = [Value::Null];
        assert_eq!(
            assert_arguments(&args, Arity::exact(2), true),
            Err(ArgumentError::Count {
                expected: "2".to_string(),
                actual: 1
            })
        );
        assert_eq!(
            assert_arguments(&[Value::Integer(1), Value::Null], Arity::exact(2), true),
            Err(ArgumentError::Null { index: 1 })
        );
        assert!(assert_arguments(&[Value::Null, Value::Null], Arity::exact(2), false).is_ok());
    }

    #[test]
    fn test_require_non_null_at_missing_index() {
        let args = [Value::Integer(1)];
        assert!(require_non_null_at(&args, 0).is_ok());
        assert_eq!(
            require_non_null_at(&args, 1),
            Err(ArgumentError::Null { index: 1 })
        );
    }

    #[test]
    fn test_require_kinds() {
        let args = [Value::from("x"), Value::Integer(2)];
        assert!(require_kinds(&args, &[Kind::String, Kind::Number]).is_ok());
        assert!(require_kinds(&args, &[Kind::String]).is_ok());
        assert_eq!(
            require_kinds(&args, &[Kind::Number]),
            Err(ArgumentError::Type {
                index: 0,
                expected: "number".to_string(),
                actual: "string".to_string()
            })
        );
        assert_eq!(
            require_kinds(&[Value::Null], &[Kind::Entity]),
            Err(ArgumentError::Null { index: 0 })
        );
        assert!(require_kinds(&[Value::Null], &[Kind::Any]).is_ok());
    }
}
