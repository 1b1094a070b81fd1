//! Function contract, validation, reporting and dispatch
//!
//! Every built-in implements [`Function`]: static metadata in a
//! [`FunctionDescriptor`] plus an `apply` entry point. Functions are resolved
//! by name through a [`FunctionRegistry`] and always invoked through
//! [`registry::invoke`], which enforces the declared arity and converts
//! argument errors into usage text.

pub mod descriptor;
pub mod native;
pub mod registry;
pub mod report;
pub mod unlicensed;
pub mod validate;

pub use descriptor::{Arity, Category, FunctionDescriptor, NullPolicy, Param, CORE_MODULE};
pub use native::{FunctionBuilder, NativeFunction};
pub use registry::{invoke, FunctionRegistry, Licensing};
pub use unlicensed::UnlicensedFunction;
pub use validate::Kind;

use crate::context::ActionContext;
use crate::error::RuntimeError;
use crate::value::Value;

/// A named, registry-resolvable scripting function
pub trait Function: Send + Sync {
    /// Static metadata
    fn descriptor(&self) -> &FunctionDescriptor;

    /// Run the function
    ///
    /// `caller` is the node or entity the expression was evaluated on
    /// (`Value::Null` when there is none). Arity has already been checked
    /// against the descriptor when called through the dispatcher.
    fn apply(
        &self,
        ctx: &mut ActionContext,
        caller: &Value,
        args: &[Value],
    ) -> Result<Value, RuntimeError>;
}
