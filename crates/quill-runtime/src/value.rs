//! Runtime value representation
//!
//! Every argument a scripting function receives and every result it returns
//! is a [`Value`]. Strings, lists and maps are reference-counted so that
//! cloning an argument list is cheap.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Ordered string-keyed map used by `Value::Map`
pub type ValueMap = BTreeMap<String, Value>;

/// Reference to a node in the property graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    /// Node identifier
    pub id: String,
    /// Node type (e.g. "User", "Page")
    pub type_name: String,
}

impl EntityRef {
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
        }
    }
}

type SeqFactory = dyn Fn() -> Box<dyn Iterator<Item = Value>> + Send + Sync;

/// Lazy, re-iterable sequence
///
/// Each call to [`LazySeq::iter`] starts a fresh pass over the source, so the
/// same value can be normalized more than once.
#[derive(Clone)]
pub struct LazySeq {
    factory: Arc<SeqFactory>,
}

impl LazySeq {
    /// Create a lazy sequence from an iterator factory
    pub fn new<F, I>(factory: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: Iterator<Item = Value> + 'static,
    {
        Self {
            factory: Arc::new(move || Box::new(factory()) as Box<dyn Iterator<Item = Value>>),
        }
    }

    /// Lazy view over an owned vector
    pub fn from_vec(values: Vec<Value>) -> Self {
        let values = Arc::new(values);
        Self::new(move || {
            let values = Arc::clone(&values);
            (0..values.len()).map(move |i| values[i].clone())
        })
    }

    /// Start a new pass over the sequence
    pub fn iter(&self) -> Box<dyn Iterator<Item = Value>> {
        (self.factory)()
    }
}

impl fmt::Debug for LazySeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LazySeq(..)")
    }
}

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value
    Null,
    Bool(bool),
    /// Whole number (counters, sizes, indices)
    Integer(i64),
    /// Floating point number
    Number(f64),
    String(Arc<String>),
    /// Growable sequence
    List(Arc<Vec<Value>>),
    /// Fixed-size sequence
    Array(Arc<[Value]>),
    /// Lazy sequence, materialized on demand
    Iterable(LazySeq),
    /// String-keyed map, iterated in key order
    Map(Arc<ValueMap>),
    /// UTC instant
    Date(DateTime<Utc>),
    /// Graph node reference
    Entity(EntityRef),
}

impl Value {
    /// Create a new string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(Arc::new(s.into()))
    }

    /// Create a new list value
    pub fn list(values: Vec<Value>) -> Self {
        Value::List(Arc::new(values))
    }

    /// Create a new fixed-size array value
    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(Arc::from(values))
    }

    /// Create a new map value
    pub fn map(entries: ValueMap) -> Self {
        Value::Map(Arc::new(entries))
    }

    /// Empty string, the result of `NullPolicy::ReturnEmpty`
    pub fn empty_string() -> Self {
        Value::string(String::new())
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Array(_) => "array",
            Value::Iterable(_) => "iterable",
            Value::Map(_) => "map",
            Value::Date(_) => "date",
            Value::Entity(_) => "entity",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value is one of the three sequence shapes
    pub fn is_collection(&self) -> bool {
        matches!(self, Value::List(_) | Value::Array(_) | Value::Iterable(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Number(_))
    }

    /// Truthiness shared by both dialects
    ///
    /// Only `Bool(true)` and the literal string `"true"` are true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::String(s) => s.as_str() == "true",
            _ => false,
        }
    }

    /// Borrow the string contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric value of an `Integer` or `Number`, without parsing strings
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Integer(_) | Value::Number(_), Value::Integer(_) | Value::Number(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Entity(a), Value::Entity(b)) => a == b,
            (a, b) if a.is_collection() && b.is_collection() => {
                let left: Vec<Value> = sequence_iter(a).collect();
                let right: Vec<Value> = sequence_iter(b).collect();
                left == right
            }
            _ => false,
        }
    }
}

fn sequence_iter(value: &Value) -> Box<dyn Iterator<Item = Value> + '_> {
    match value {
        Value::List(items) => Box::new(items.iter().cloned()),
        Value::Array(items) => Box::new(items.iter().cloned()),
        Value::Iterable(seq) => seq.iter(),
        _ => Box::new(std::iter::empty()),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Number(n) => {
                // No trailing .0 for whole numbers
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s.as_str()),
            Value::List(_) | Value::Array(_) | Value::Iterable(_) => {
                let elements: Vec<String> = sequence_iter(self).map(|v| v.to_string()).collect();
                write!(f, "[{}]", elements.join(", "))
            }
            Value::Map(map) => {
                let entries: Vec<String> = map.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{{{}}}", entries.join(", "))
            }
            Value::Date(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Entity(entity) => write!(f, "{}", entity.id),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<EntityRef> for Value {
    fn from(entity: EntityRef) -> Self {
        Value::Entity(entity)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::list(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_display_drops_trailing_zero() {
        assert_eq!(Value::Number(6.0).to_string(), "6");
        assert_eq!(Value::Number(5.8).to_string(), "5.8");
        assert_eq!(Value::Integer(-3).to_string(), "-3");
    }

    #[test]
    fn test_collection_display() {
        let list = Value::list(vec![Value::Integer(1), Value::Null, Value::string("a")]);
        assert_eq!(list.to_string(), "[1, null, a]");

        let mut map = ValueMap::new();
        map.insert("b".to_string(), Value::Integer(2));
        map.insert("a".to_string(), Value::Bool(true));
        assert_eq!(Value::map(map).to_string(), "{a=true, b=2}");
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::string("true").is_truthy());
        assert!(!Value::string("TRUE").is_truthy());
        assert!(!Value::string("yes").is_truthy());
        assert!(!Value::Integer(1).is_truthy());
        assert!(!Value::Null.is_truthy());
    }

    #[test]
    fn test_numeric_equality_across_representations() {
        assert_eq!(Value::Integer(5), Value::Number(5.0));
        assert_ne!(Value::Integer(5), Value::string("5"));
        assert_ne!(Value::Null, Value::Integer(0));
    }

    #[test]
    fn test_sequence_shapes_compare_by_contents() {
        let items = vec![Value::Integer(1), Value::Integer(2)];
        let list = Value::list(items.clone());
        let array = Value::array(items.clone());
        let lazy = Value::Iterable(LazySeq::from_vec(items));

        assert_eq!(list, array);
        assert_eq!(array, lazy);
    }

    #[test]
    fn test_lazy_seq_is_reiterable() {
        let seq = LazySeq::new(|| (1..=3).map(Value::Integer));
        assert_eq!(seq.iter().count(), 3);
        assert_eq!(seq.iter().count(), 3);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::string("x"));
    }
}
