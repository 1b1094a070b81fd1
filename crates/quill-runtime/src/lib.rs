//! Quill Runtime - built-in scripting functions
//!
//! This library provides the function catalog that template and script
//! expressions call into:
//! - The function contract, argument validation and usage reporting
//! - A name/alias registry with module licensing
//! - The per-evaluation execution context
//! - Built-in math, string, collection, logic, security, cache and graph functions
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use quill_runtime::{ActionContext, FunctionRegistry, Licensing, Services, Value};
//!
//! let registry = FunctionRegistry::with_builtins(Licensing::all()).unwrap();
//! let mut ctx = ActionContext::new(Arc::new(registry), Arc::new(Services::default()));
//!
//! let sum = ctx
//!     .call_function("add", &Value::Null, &[Value::Integer(1), Value::Integer(2)])
//!     .unwrap();
//! assert_eq!(sum, Value::Number(3.0));
//!
//! let usage = ctx.call_function("upper", &Value::Null, &[]).unwrap();
//! assert_eq!(usage.to_string(), "Usage: ${upper(string)}. Example: ${upper(\"hello\")}");
//! ```

/// Quill runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod builtins;
pub mod context;
pub mod convert;
pub mod dialect;
pub mod docs;
pub mod error;
pub mod function;
pub mod locale;
pub mod logging;
pub mod security;
pub mod services;
pub mod value;

// Re-export commonly used types
pub use context::{ActionContext, CancellationToken, ErrorToken};
pub use dialect::Dialect;
pub use error::{ArgumentError, RegistryError, RuntimeError};
pub use function::{Function, FunctionDescriptor, FunctionRegistry, Licensing};
pub use locale::Locale;
pub use services::Services;
pub use value::{EntityRef, Value, ValueMap};
