//! Error types shared by every scripting function

use crate::convert::CoercionError;
use crate::security::SecurityError;
use crate::services::GraphError;
use thiserror::Error;

/// Argument validation failures
///
/// `Count` and `Type` are caller mistakes and always surface usage text.
/// `Null` is resolved by the function's null policy, which often degrades
/// silently to a null or empty result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("expected {expected} argument(s), got {actual}")]
    Count { expected: String, actual: usize },

    #[error("argument {index} must not be null")]
    Null { index: usize },

    #[error("argument {index}: expected {expected}, found {actual}")]
    Type {
        index: usize,
        expected: String,
        actual: String,
    },
}

/// Errors raised while invoking a scripting function
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    /// The owning module is not licensed; fatal to the call only
    #[error("Function '{function}' requires module '{module}', which is not licensed")]
    Unlicensed { function: String, module: String },

    #[error("Assertion failed ({status}): {message}")]
    AssertionFailed { status: u16, message: String },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Coercion(#[from] CoercionError),
}

/// Startup-time registry failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Function name '{name}' is already registered")]
    Duplicate { name: String },

    #[error("Native function '{0}' missing implementation")]
    MissingImplementation(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
