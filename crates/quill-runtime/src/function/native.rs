//! Native function registration and builder
//!
//! Wraps a Rust closure and a [`FunctionDescriptor`] into a [`Function`] that
//! can be registered like any built-in.
//!
//! # Examples
//!
//! ```
//! use quill_runtime::function::{Arity, Category, FunctionBuilder, FunctionDescriptor};
//! use quill_runtime::Value;
//!
//! let greet = FunctionBuilder::new(
//!     FunctionDescriptor::new("greet", Category::String)
//!         .arity(Arity::exact(1))
//!         .signature("name")
//!         .example("\"World\""),
//! )
//! .with_implementation(|_ctx, _caller, args| {
//!     Ok(Value::string(format!("Hello, {}!", args[0])))
//! })
//! .build()
//! .unwrap();
//! ```

use crate::context::ActionContext;
use crate::error::{RegistryError, RuntimeError};
use crate::function::descriptor::FunctionDescriptor;
use crate::function::Function;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Closure signature of a native function body
pub type NativeFn =
    Arc<dyn Fn(&mut ActionContext, &Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync>;

/// Function backed by a closure
#[derive(Clone)]
pub struct NativeFunction {
    descriptor: FunctionDescriptor,
    body: NativeFn,
}

impl NativeFunction {
    pub fn new(descriptor: FunctionDescriptor, body: NativeFn) -> Self {
        Self { descriptor, body }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.descriptor.name())
    }
}

impl Function for NativeFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn apply(
        &self,
        ctx: &mut ActionContext,
        caller: &Value,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        (self.body)(ctx, caller, args)
    }
}

/// Fluent builder for [`NativeFunction`]
pub struct FunctionBuilder {
    descriptor: FunctionDescriptor,
    implementation: Option<NativeFn>,
}

impl FunctionBuilder {
    pub fn new(descriptor: FunctionDescriptor) -> Self {
        Self {
            descriptor,
            implementation: None,
        }
    }

    /// Set the function body
    ///
    /// The argument count is validated by the dispatcher before the body runs.
    pub fn with_implementation<F>(mut self, implementation: F) -> Self
    where
        F: Fn(&mut ActionContext, &Value, &[Value]) -> Result<Value, RuntimeError>
            + Send
            + Sync
            + 'static,
    {
        self.implementation = Some(Arc::new(implementation));
        self
    }

    /// Build the function
    ///
    /// # Errors
    ///
    /// `RegistryError::MissingImplementation` if no body was provided.
    pub fn build(self) -> Result<NativeFunction, RegistryError> {
        let body = self.implementation.ok_or_else(|| {
            RegistryError::MissingImplementation(self.descriptor.name().to_string())
        })?;
        Ok(NativeFunction::new(self.descriptor, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::descriptor::{Arity, Category};

    #[test]
    fn test_builder_missing_implementation() {
        let result = FunctionBuilder::new(FunctionDescriptor::new("test", Category::Math)).build();
        assert_eq!(
            result.unwrap_err(),
            RegistryError::MissingImplementation("test".to_string())
        );
    }

    #[test]
    fn test_builder_keeps_descriptor() {
        let f = FunctionBuilder::new(
            FunctionDescriptor::new("twice", Category::Math).arity(Arity::exact(1)),
        )
        .with_implementation(|_, _, args| Ok(args[0].clone()))
        .build()
        .unwrap();

        assert_eq!(f.descriptor().name(), "twice");
        assert_eq!(f.descriptor().declared_arity(), Arity::exact(1));
        assert_eq!(format!("{:?}", f), "<native fn twice>");
    }
}
