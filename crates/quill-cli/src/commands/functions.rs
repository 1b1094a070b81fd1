//! Functions command - list the catalog

use super::Session;
use anyhow::{bail, Result};
use colored::Colorize;
use quill_runtime::function::{Category, FunctionDescriptor};

/// List functions grouped by category
pub fn run(session: &Session, category: Option<&str>, all: bool) -> Result<()> {
    let categories: Vec<Category> = match category {
        Some(name) => match Category::parse(name) {
            Some(category) => vec![category],
            None => bail!(
                "Unknown category '{}' (expected one of: {})",
                name,
                Category::ALL.map(Category::as_str).join(", ")
            ),
        },
        None => Category::ALL.to_vec(),
    };

    for category in categories {
        let listed: Vec<&FunctionDescriptor> = if all {
            session.registry.iter().filter(|d| d.category() == category).collect()
        } else {
            session
                .registry
                .documented()
                .filter(|d| d.category() == category)
                .collect()
        };
        if listed.is_empty() {
            continue;
        }

        println!("{}", category.as_str().bold().underline());
        for descriptor in listed {
            println!("  {}", format_entry(session, descriptor));
        }
        println!();
    }
    Ok(())
}

fn format_entry(session: &Session, descriptor: &FunctionDescriptor) -> String {
    let mut line = format!(
        "{:<24} {}",
        descriptor.name().green(),
        descriptor.short_description()
    );
    if !descriptor.aliases().is_empty() {
        line.push_str(&format!(" (alias: {})", descriptor.aliases().join(", ")).dimmed().to_string());
    }
    if !session.registry.is_available(descriptor.name()) {
        line.push_str(&format!(
            " {}",
            format!("[requires {}]", descriptor.required_module()).yellow()
        ));
    } else if descriptor.is_hidden() {
        line.push_str(&format!(" {}", "[hidden]".dimmed()));
    }
    line
}
