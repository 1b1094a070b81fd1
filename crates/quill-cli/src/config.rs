//! CLI configuration via environment variables
//!
//! Runtime settings live in quill.toml; these only affect how the CLI
//! prints.

use std::env;

/// CLI output preferences loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Print call results as JSON (QUILL_OUTPUT=json)
    pub default_json: bool,
    /// Disable colored output (QUILL_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            default_json: env::var("QUILL_OUTPUT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            no_color: env::var("QUILL_NO_COLOR").is_ok() || env::var("NO_COLOR").is_ok(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
