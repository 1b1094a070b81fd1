//! Doc command - show the documentation of one function

use super::Session;
use anyhow::{Context, Result};
use quill_runtime::docs::render_function;

pub fn run(session: &Session, name: &str) -> Result<()> {
    let descriptor = session
        .registry
        .descriptor(name)
        .with_context(|| format!("Unknown function '{}'", name))?;

    let mut text = String::new();
    render_function(&mut text, descriptor, session.dialect);
    print!("{}", text.trim_start());
    if !session.registry.is_available(name) {
        println!(
            "\nNot licensed: requires module '{}'.",
            descriptor.required_module()
        );
    }
    Ok(())
}
