//! Property graph collaborator
//!
//! Scripting functions only read and annotate nodes; storage, indexing and
//! transactions belong to the embedding application. [`InMemoryGraph`] is
//! the reference implementation used by the CLI and the tests.

use crate::value::{EntityRef, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use thiserror::Error;

/// Property graph errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    #[error("Property '{key}' is read-only")]
    ReadOnlyProperty { key: String },

    #[error("Invalid label '{0}'")]
    InvalidLabel(String),
}

/// Property keys managed by the store itself
pub const READ_ONLY_KEYS: &[&str] = &["id", "type"];

/// Access grants of one node, keyed by principal id
pub type Grants = BTreeMap<String, BTreeSet<String>>;

/// Node/label/property access used by the database functions
pub trait GraphStore: Send + Sync {
    /// Create a node and return its reference
    fn create_node(
        &self,
        type_name: &str,
        properties: BTreeMap<String, Value>,
    ) -> Result<EntityRef, GraphError>;

    /// Look a node up by id
    fn get_node(&self, id: &str) -> Result<EntityRef, GraphError>;

    /// Nodes of a type, optionally restricted to `key == value`
    fn find(&self, type_name: &str, filter: Option<(&str, &Value)>) -> Vec<EntityRef>;

    fn labels(&self, node: &EntityRef) -> Result<BTreeSet<String>, GraphError>;

    fn add_labels(&self, node: &EntityRef, labels: &[String]) -> Result<(), GraphError>;

    fn remove_labels(&self, node: &EntityRef, labels: &[String]) -> Result<(), GraphError>;

    /// Property keys in key order, including `id` and `type`
    fn property_keys(&self, node: &EntityRef) -> Result<Vec<String>, GraphError>;

    /// Property value, `Value::Null` when unset
    fn get_property(&self, node: &EntityRef, key: &str) -> Result<Value, GraphError>;

    /// Set a property; `Value::Null` removes it
    fn set_property(&self, node: &EntityRef, key: &str, value: Value) -> Result<(), GraphError>;

    fn grant(
        &self,
        node: &EntityRef,
        principal: &str,
        permissions: &[&str],
    ) -> Result<(), GraphError>;

    fn grants(&self, node: &EntityRef) -> Result<Grants, GraphError>;

    /// Copy access grants from `source` to `target`
    ///
    /// With `overwrite` the target's grants are replaced, otherwise merged.
    fn copy_permissions(
        &self,
        source: &EntityRef,
        target: &EntityRef,
        overwrite: bool,
    ) -> Result<(), GraphError>;
}

#[derive(Debug, Clone)]
struct Node {
    type_name: String,
    labels: BTreeSet<String>,
    properties: BTreeMap<String, Value>,
    grants: Grants,
}

/// Thread-safe in-memory graph
#[derive(Debug, Default)]
pub struct InMemoryGraph {
    nodes: RwLock<BTreeMap<String, Node>>,
    next_id: AtomicU64,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Node>> {
        self.nodes.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Node>> {
        self.nodes.write().unwrap_or_else(|e| e.into_inner())
    }

    fn with_node<R>(
        &self,
        node: &EntityRef,
        f: impl FnOnce(&Node) -> R,
    ) -> Result<R, GraphError> {
        self.read()
            .get(&node.id)
            .map(f)
            .ok_or_else(|| not_found(&node.id))
    }

    fn with_node_mut<R>(
        &self,
        node: &EntityRef,
        f: impl FnOnce(&mut Node) -> R,
    ) -> Result<R, GraphError> {
        self.write()
            .get_mut(&node.id)
            .map(f)
            .ok_or_else(|| not_found(&node.id))
    }
}

fn not_found(id: &str) -> GraphError {
    GraphError::NodeNotFound { id: id.to_string() }
}

fn validate_labels(labels: &[String]) -> Result<(), GraphError> {
    for label in labels {
        if label.is_empty() || label.chars().any(char::is_whitespace) {
            return Err(GraphError::InvalidLabel(label.clone()));
        }
    }
    Ok(())
}

impl GraphStore for InMemoryGraph {
    fn create_node(
        &self,
        type_name: &str,
        properties: BTreeMap<String, Value>,
    ) -> Result<EntityRef, GraphError> {
        if let Some(key) = properties
            .keys()
            .find(|k| READ_ONLY_KEYS.contains(&k.as_str()))
        {
            return Err(GraphError::ReadOnlyProperty { key: key.clone() });
        }
        let id = format!("{:032x}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut labels = BTreeSet::new();
        labels.insert(type_name.to_string());

        self.write().insert(
            id.clone(),
            Node {
                type_name: type_name.to_string(),
                labels,
                properties,
                grants: Grants::new(),
            },
        );
        Ok(EntityRef::new(id, type_name))
    }

    fn get_node(&self, id: &str) -> Result<EntityRef, GraphError> {
        self.read()
            .get(id)
            .map(|node| EntityRef::new(id, node.type_name.clone()))
            .ok_or_else(|| not_found(id))
    }

    fn find(&self, type_name: &str, filter: Option<(&str, &Value)>) -> Vec<EntityRef> {
        self.read()
            .iter()
            .filter(|(_, node)| node.type_name == type_name)
            .filter(|(_, node)| match filter {
                Some((key, expected)) => node.properties.get(key) == Some(expected),
                None => true,
            })
            .map(|(id, node)| EntityRef::new(id.clone(), node.type_name.clone()))
            .collect()
    }

    fn labels(&self, node: &EntityRef) -> Result<BTreeSet<String>, GraphError> {
        self.with_node(node, |n| n.labels.clone())
    }

    fn add_labels(&self, node: &EntityRef, labels: &[String]) -> Result<(), GraphError> {
        validate_labels(labels)?;
        self.with_node_mut(node, |n| n.labels.extend(labels.iter().cloned()))
    }

    fn remove_labels(&self, node: &EntityRef, labels: &[String]) -> Result<(), GraphError> {
        validate_labels(labels)?;
        self.with_node_mut(node, |n| {
            for label in labels {
                n.labels.remove(label);
            }
        })
    }

    fn property_keys(&self, node: &EntityRef) -> Result<Vec<String>, GraphError> {
        self.with_node(node, |n| {
            let mut keys: Vec<String> = READ_ONLY_KEYS.iter().map(|k| k.to_string()).collect();
            keys.extend(n.properties.keys().cloned());
            keys.sort();
            keys
        })
    }

    fn get_property(&self, node: &EntityRef, key: &str) -> Result<Value, GraphError> {
        self.with_node(node, |n| match key {
            "id" => Value::string(node.id.clone()),
            "type" => Value::string(n.type_name.clone()),
            _ => n.properties.get(key).cloned().unwrap_or(Value::Null),
        })
    }

    fn set_property(&self, node: &EntityRef, key: &str, value: Value) -> Result<(), GraphError> {
        if READ_ONLY_KEYS.contains(&key) {
            return Err(GraphError::ReadOnlyProperty {
                key: key.to_string(),
            });
        }
        self.with_node_mut(node, |n| {
            if value.is_null() {
                n.properties.remove(key);
            } else {
                n.properties.insert(key.to_string(), value);
            }
        })
    }

    fn grant(
        &self,
        node: &EntityRef,
        principal: &str,
        permissions: &[&str],
    ) -> Result<(), GraphError> {
        self.with_node_mut(node, |n| {
            n.grants
                .entry(principal.to_string())
                .or_default()
                .extend(permissions.iter().map(|p| p.to_string()));
        })
    }

    fn grants(&self, node: &EntityRef) -> Result<Grants, GraphError> {
        self.with_node(node, |n| n.grants.clone())
    }

    fn copy_permissions(
        &self,
        source: &EntityRef,
        target: &EntityRef,
        overwrite: bool,
    ) -> Result<(), GraphError> {
        let grants = self.grants(source)?;
        self.with_node_mut(target, |n| {
            if overwrite {
                n.grants = grants;
            } else {
                for (principal, permissions) in grants {
                    n.grants.entry(principal).or_default().extend(permissions);
                }
            }
        })
    }
}
