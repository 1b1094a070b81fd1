//! Call command - invoke one function with JSON arguments

use super::Session;
use anyhow::{Context, Result};
use quill_runtime::convert::{from_json, to_json};
use quill_runtime::Value;

/// Parse a command-line argument; text that is not JSON is a plain string
pub fn parse_argument(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => from_json(&json),
        Err(_) => Value::string(raw),
    }
}

pub fn run(session: &Session, name: &str, raw_args: &[String], json: bool) -> Result<()> {
    let args: Vec<Value> = raw_args.iter().map(|raw| parse_argument(raw)).collect();
    let mut ctx = session.context();
    let result = ctx
        .call_function(name, &Value::Null, &args)
        .with_context(|| format!("{}() failed", name))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&to_json(&result))?);
    } else {
        println!("{}", result);
    }
    for token in ctx.errors() {
        eprintln!("error token: {}", serde_json::to_string(token)?);
    }
    Ok(())
}
