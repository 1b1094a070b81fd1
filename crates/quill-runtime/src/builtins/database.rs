//! Graph and transaction functions
//!
//! Nodes are passed as entities or as node id strings. Graph failures (such
//! as an unknown node) are logged by the dispatcher and read as null.

use super::{arg, entity, names, native, optional};
use crate::context::{ActionContext, PrefetchHint};
use crate::error::{ArgumentError, RegistryError, RuntimeError};
use crate::function::validate::{require_non_null, require_non_null_at};
use crate::function::{Arity, Category, FunctionDescriptor, NativeFunction, NullPolicy};
use crate::services::{GraphError, READ_ONLY_KEYS};
use crate::value::Value;

pub fn functions() -> Result<Vec<NativeFunction>, RegistryError> {
    Ok(vec![
        native(
            FunctionDescriptor::new("get", Category::Database)
                .arity(Arity::exact(2))
                .signature("entityOrMap, key")
                .summary("Returns a property of an entity or an entry of a map")
                .example("me(), \"name\""),
            get,
        )?,
        native(
            FunctionDescriptor::new("set", Category::Database)
                .arity(Arity::range(2, 3))
                .signature("entity, key, value")
                .summary("Sets a property of an entity")
                .description(
                    "With two arguments the second must be a map whose entries are all set. \
                     Setting null removes the property; id and type are read-only.",
                )
                .example("retrieve(\"user\"), \"name\", \"alice\""),
            set,
        )?,
        native(
            FunctionDescriptor::new("keys", Category::Database)
                .arity(Arity::exact(1))
                .signature("entityOrMap")
                .summary("Returns the property keys of an entity or the keys of a map")
                .example("retrieve(\"user\")"),
            keys,
        )?,
        native(
            FunctionDescriptor::new("find", Category::Database)
                .arity(Arity::range(1, 3))
                .signature("type [, key, value ]")
                .summary("Returns every node of a type, optionally filtered by one property")
                .example("\"User\", \"name\", \"alice\""),
            find,
        )?,
        native(
            FunctionDescriptor::new("add_labels", Category::Database)
                .arity(Arity::exact(2))
                .signature("entity, labels")
                .summary("Adds labels to a node")
                .param("labels", "A label, a comma separated list or a collection")
                .example("retrieve(\"user\"), \"Admin,Staff\"")
                .null_policy(NullPolicy::Usage),
            |ctx, _, args| {
                require_non_null(args)?;
                let node = entity(ctx, args, 0)?;
                ctx.services().graph.add_labels(&node, &names(&args[1]))?;
                Ok(Value::Null)
            },
        )?,
        native(
            FunctionDescriptor::new("remove_labels", Category::Database)
                .arity(Arity::exact(2))
                .signature("entity, labels")
                .summary("Removes labels from a node")
                .param("labels", "A label, a comma separated list or a collection")
                .example("retrieve(\"user\"), \"Staff\"")
                .null_policy(NullPolicy::Usage),
            |ctx, _, args| {
                require_non_null(args)?;
                let node = entity(ctx, args, 0)?;
                ctx.services().graph.remove_labels(&node, &names(&args[1]))?;
                Ok(Value::Null)
            },
        )?,
        native(
            FunctionDescriptor::new("copy_permissions", Category::Database)
                .arity(Arity::range(2, 3))
                .signature("source, target [, overwrite ]")
                .summary("Copies the access grants of one node to another")
                .description("Grants are merged unless overwrite is true.")
                .example("retrieve(\"template\"), retrieve(\"page\")")
                .null_policy(NullPolicy::Usage),
            |ctx, _, args| {
                require_non_null_at(args, 0)?;
                require_non_null_at(args, 1)?;
                let source = entity(ctx, args, 0)?;
                let target = entity(ctx, args, 1)?;
                let overwrite = arg(args, 2).is_truthy();
                ctx.services()
                    .graph
                    .copy_permissions(&source, &target, overwrite)?;
                Ok(Value::Null)
            },
        )?,
        native(
            FunctionDescriptor::new("prefetch", Category::Database)
                .arity(Arity::at_least(1))
                .signature("type [, keys... ]")
                .summary("Hints the transaction to load properties of a type up front")
                .example("\"User\", \"name\", \"email\""),
            |ctx, _, args| {
                require_non_null_at(args, 0)?;
                let hint = PrefetchHint {
                    type_name: args[0].to_string(),
                    keys: args[1..].iter().flat_map(names).collect(),
                };
                ctx.transaction_mut().add_prefetch_hint(hint);
                Ok(Value::Null)
            },
        )?,
        native(
            FunctionDescriptor::new("rollback_transaction", Category::Database)
                .arity(Arity::exact(0))
                .signature("")
                .summary("Marks the surrounding transaction for rollback"),
            |ctx, _, _| {
                ctx.transaction_mut().mark_rollback_only();
                Ok(Value::Null)
            },
        )?,
    ])
}

fn get(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let key = args[1].to_string();
    match &args[0] {
        Value::Map(map) => Ok(map.get(&key).cloned().unwrap_or(Value::Null)),
        _ => {
            let node = entity(ctx, args, 0)?;
            Ok(ctx.services().graph.get_property(&node, &key)?)
        }
    }
}

fn set(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null_at(args, 0)?;
    require_non_null_at(args, 1)?;
    let node = entity(ctx, args, 0)?;
    let graph = &ctx.services().graph;
    match (args.len(), &args[1]) {
        (2, Value::Map(entries)) => {
            // all or nothing
            if let Some(key) = entries
                .keys()
                .find(|key| READ_ONLY_KEYS.contains(&key.as_str()))
            {
                return Err(GraphError::ReadOnlyProperty { key: key.clone() }.into());
            }
            for (key, value) in entries.iter() {
                graph.set_property(&node, key, value.clone())?;
            }
        }
        (2, other) => {
            return Err(ArgumentError::Type {
                index: 1,
                expected: "map".to_string(),
                actual: other.type_name().to_string(),
            }
            .into())
        }
        _ => graph.set_property(&node, &args[1].to_string(), arg(args, 2).clone())?,
    }
    Ok(Value::Null)
}

fn keys(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let keys: Vec<String> = match &args[0] {
        Value::Map(map) => map.keys().cloned().collect(),
        _ => {
            let node = entity(ctx, args, 0)?;
            ctx.services().graph.property_keys(&node)?
        }
    };
    Ok(Value::list(keys.into_iter().map(Value::from).collect()))
}

fn find(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() == 2 {
        return Err(ArgumentError::Count {
            expected: "1 or 3".to_string(),
            actual: 2,
        }
        .into());
    }
    require_non_null_at(args, 0)?;
    let type_name = args[0].to_string();
    let key = optional(args, 1).map(Value::to_string);
    let filter = key.as_deref().map(|key| (key, arg(args, 2)));
    let nodes = ctx.services().graph.find(&type_name, filter);
    Ok(Value::list(nodes.into_iter().map(Value::Entity).collect()))
}
