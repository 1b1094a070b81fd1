use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use quill_runtime::Dialect;
use std::io;

mod commands;
mod config;

/// Quill built-in scripting functions.
///
/// Inspect the function catalog available to template and script
/// expressions, read its documentation and try functions out.
///
/// EXAMPLES:
///     quill functions                   List every available function
///     quill functions -c string         List the string functions
///     quill doc add                     Show the documentation of add()
///     quill call add 1 2 3              Call add(1, 2, 3)
///     quill call upper '"hello"'        Arguments are JSON values
///     quill docs > FUNCTIONS.md         Write the markdown reference
///
/// ENVIRONMENT VARIABLES:
///     QUILL_DIALECT     Dialect used for usage text (template or script)
///     QUILL_LOCALE      Locale for number parsing and formatting
///     QUILL_LOG         Log level (trace, debug, info, warn, error, off)
///     QUILL_MODULES     Comma separated licensed modules
///     QUILL_OUTPUT      Set to 'json' for JSON call results by default
///     NO_COLOR          Set to disable colored output
#[derive(Parser)]
#[command(name = "quill")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Dialect for usage text, overrides configuration
    #[arg(long, short = 'd', global = true)]
    dialect: Option<Dialect>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered functions
    ///
    /// EXAMPLES:
    ///     quill functions               Licensed, documented functions
    ///     quill functions --all         Include hidden and unlicensed ones
    ///     quill functions -c math       Only one category
    #[command(visible_alias = "ls")]
    Functions {
        /// Only list this category (math, string, collection, ...)
        #[arg(long, short = 'c')]
        category: Option<String>,
        /// Include hidden and unlicensed functions
        #[arg(long, short = 'a')]
        all: bool,
    },

    /// Show the documentation of one function
    ///
    /// EXAMPLES:
    ///     quill doc round
    ///     quill doc modulo --dialect script
    Doc {
        /// Function name or alias
        name: String,
    },

    /// Call a function
    ///
    /// Each argument is parsed as JSON; anything that is not valid JSON is
    /// passed as a plain string.
    ///
    /// EXAMPLES:
    ///     quill call add 1 2 3
    ///     quill call join '["a","b"]' '", "'
    ///     quill call --json size '[1,2,null,3]'
    #[command(visible_alias = "c")]
    Call {
        /// Function name or alias
        name: String,
        /// Arguments as JSON values
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the markdown reference of the catalog
    Docs,

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     quill completions bash > ~/.local/share/bash-completion/completions/quill
    ///     quill completions zsh > ~/.zfunc/_quill
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();
    if cli_config.no_color {
        colored::control::set_override(false);
    }

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let session = commands::Session::load(cli.dialect)?;

    match cli.command {
        Commands::Functions { category, all } => {
            commands::functions::run(&session, category.as_deref(), all)?;
        }
        Commands::Doc { name } => {
            commands::doc::run(&session, &name)?;
        }
        Commands::Call { name, args, json } => {
            // Command-line flag overrides environment variable
            let use_json = json || cli_config.default_json;
            commands::call::run(&session, &name, &args, use_json)?;
        }
        Commands::Docs => {
            print!("{}", quill_runtime::docs::render_markdown(&session.registry, session.dialect));
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
