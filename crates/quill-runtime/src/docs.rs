//! Markdown reference for the registered catalog

use crate::dialect::Dialect;
use crate::function::report::usage;
use crate::function::{Category, FunctionDescriptor, FunctionRegistry};
use std::fmt::Write;

/// Render every documented function, grouped by category
///
/// Hidden and unlicensed functions are left out. Categories without any
/// documented function get no heading.
pub fn render_markdown(registry: &FunctionRegistry, dialect: Dialect) -> String {
    let mut out = String::from("# Built-in functions\n");
    for category in Category::ALL {
        let functions: Vec<&FunctionDescriptor> = registry
            .documented()
            .filter(|d| d.category() == category)
            .collect();
        if functions.is_empty() {
            continue;
        }
        let _ = write!(out, "\n## {}\n", category);
        for descriptor in functions {
            render_function(&mut out, descriptor, dialect);
        }
    }
    out
}

/// Render one function section
pub fn render_function(out: &mut String, descriptor: &FunctionDescriptor, dialect: Dialect) {
    let _ = write!(out, "\n### {}\n\n", descriptor.name());
    if !descriptor.aliases().is_empty() {
        let _ = writeln!(out, "Aliases: {}\n", descriptor.aliases().join(", "));
    }
    if !descriptor.short_description().is_empty() {
        let _ = writeln!(out, "{}\n", descriptor.short_description());
    }
    if !descriptor.long_description().is_empty() {
        let _ = writeln!(out, "{}\n", descriptor.long_description());
    }
    if !descriptor.params().is_empty() {
        for param in descriptor.params() {
            let marker = if param.optional { " (optional)" } else { "" };
            let _ = writeln!(out, "- `{}`{}: {}", param.name, marker, param.description);
        }
        out.push('\n');
    }
    let _ = writeln!(out, "`{}`", usage(descriptor, dialect));
}
