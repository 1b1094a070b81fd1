//! Function registry and dispatcher
//!
//! Names and aliases share one namespace; registering a clashing name is a
//! startup error. Functions whose module is not licensed stay resolvable but
//! resolve to an [`UnlicensedFunction`] stand-in.

use crate::context::ActionContext;
use crate::error::{ArgumentError, RegistryError, RuntimeError};
use crate::function::descriptor::{FunctionDescriptor, NullPolicy, CORE_MODULE};
use crate::function::unlicensed::UnlicensedFunction;
use crate::function::{report, validate, Function};
use crate::value::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Licensed modules
///
/// The core module is always licensed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Licensing {
    modules: BTreeSet<String>,
}

impl Licensing {
    /// Every known module
    pub fn all() -> Self {
        Self::new(quill_config::KNOWN_MODULES.iter().copied())
    }

    /// Only the core module
    pub fn core_only() -> Self {
        Self::new(std::iter::empty::<&str>())
    }

    pub fn new<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut modules: BTreeSet<String> = modules.into_iter().map(Into::into).collect();
        modules.insert(CORE_MODULE.to_string());
        Self { modules }
    }

    pub fn is_licensed(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(String::as_str)
    }
}

impl Default for Licensing {
    fn default() -> Self {
        Self::all()
    }
}

struct Entry {
    function: Arc<dyn Function>,
    /// Precomputed when the function's module is not licensed
    placeholder: Option<Arc<dyn Function>>,
}

impl Entry {
    fn effective(&self) -> Arc<dyn Function> {
        match &self.placeholder {
            Some(placeholder) => Arc::clone(placeholder),
            None => Arc::clone(&self.function),
        }
    }
}

/// Name → function map in registration order
pub struct FunctionRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    licensing: Licensing,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.entries.len())
            .field("licensing", &self.licensing)
            .finish()
    }
}

impl FunctionRegistry {
    /// Empty registry
    pub fn new(licensing: Licensing) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            licensing,
        }
    }

    /// Registry containing the whole built-in catalog
    pub fn with_builtins(licensing: Licensing) -> Result<Self, RegistryError> {
        let mut registry = Self::new(licensing);
        crate::builtins::register_all(&mut registry)?;
        Ok(registry)
    }

    /// Register a function under its name and aliases
    ///
    /// # Errors
    ///
    /// `RegistryError::Duplicate` if any name is already taken; the registry
    /// is left unchanged in that case.
    pub fn register(&mut self, function: impl Function + 'static) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(function))
    }

    pub fn register_arc(&mut self, function: Arc<dyn Function>) -> Result<(), RegistryError> {
        let descriptor = function.descriptor();
        let mut seen = BTreeSet::new();
        for name in descriptor.names() {
            if self.index.contains_key(name) || !seen.insert(name) {
                return Err(RegistryError::Duplicate {
                    name: name.to_string(),
                });
            }
        }

        let placeholder: Option<Arc<dyn Function>> =
            if self.licensing.is_licensed(descriptor.required_module()) {
                None
            } else {
                Some(Arc::new(UnlicensedFunction::for_descriptor(descriptor)))
            };

        let slot = self.entries.len();
        for name in descriptor.names() {
            self.index.insert(name.to_string(), slot);
        }
        self.entries.push(Entry {
            function,
            placeholder,
        });
        Ok(())
    }

    /// Resolve a name or alias
    ///
    /// Unlicensed functions resolve to their placeholder.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.index.get(name).map(|&slot| self.entries[slot].effective())
    }

    /// Descriptor of the registered function (never the placeholder's)
    pub fn descriptor(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.index
            .get(name)
            .map(|&slot| self.entries[slot].function.descriptor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.index
            .get(name)
            .is_some_and(|&slot| self.entries[slot].placeholder.is_none())
    }

    /// Registered descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.entries.iter().map(|entry| entry.function.descriptor())
    }

    /// Licensed, non-hidden descriptors in registration order
    pub fn documented(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.entries
            .iter()
            .filter(|entry| entry.placeholder.is_none())
            .map(|entry| entry.function.descriptor())
            .filter(|descriptor| !descriptor.is_hidden())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn licensing(&self) -> &Licensing {
        &self.licensing
    }

    /// Resolve and invoke
    ///
    /// # Errors
    ///
    /// `RuntimeError::UnknownFunction` for names that are not registered, plus
    /// everything [`invoke`] propagates.
    pub fn call(
        &self,
        ctx: &mut ActionContext,
        name: &str,
        caller: &Value,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let function = self
            .resolve(name)
            .ok_or_else(|| RuntimeError::UnknownFunction(name.to_string()))?;
        invoke(function.as_ref(), ctx, caller, args)
    }
}

/// Invoke a function with the shared calling conventions
///
/// - arity is checked against the descriptor before `apply` runs
/// - `Count`/`Type` argument errors are logged and become usage text
/// - `Null` argument errors follow the descriptor's [`NullPolicy`]
/// - coercion failures are logged and become their message string
/// - graph and security failures are logged and become `Value::Null`
/// - licensing, assertion and unknown-function errors propagate
pub fn invoke(
    function: &dyn Function,
    ctx: &mut ActionContext,
    caller: &Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    let descriptor = function.descriptor();
    tracing::debug!(function = descriptor.name(), args = args.len(), "dispatch");

    let result = validate::check_arity(args, descriptor.declared_arity())
        .map_err(RuntimeError::from)
        .and_then(|()| function.apply(ctx, caller, args));

    match result {
        Ok(value) => Ok(value),
        Err(RuntimeError::Argument(error)) => {
            Ok(recover_argument_error(descriptor, ctx, caller, args, &error))
        }
        Err(RuntimeError::Coercion(error)) => {
            report::log_exception(descriptor, caller, args, &error);
            Ok(Value::string(error.to_string()))
        }
        Err(error @ (RuntimeError::Graph(_) | RuntimeError::Security(_))) => {
            report::log_exception(descriptor, caller, args, &error);
            Ok(Value::Null)
        }
        Err(error) => Err(error),
    }
}

fn recover_argument_error(
    descriptor: &FunctionDescriptor,
    ctx: &ActionContext,
    caller: &Value,
    args: &[Value],
    error: &ArgumentError,
) -> Value {
    let policy = match error {
        ArgumentError::Null { .. } => descriptor.null_handling(),
        ArgumentError::Count { .. } | ArgumentError::Type { .. } => NullPolicy::Usage,
    };
    match policy {
        NullPolicy::ReturnNull => Value::Null,
        NullPolicy::ReturnEmpty => Value::empty_string(),
        NullPolicy::Usage => {
            report::log_parameter_error(descriptor, caller, args, ctx.dialect());
            Value::string(report::usage(descriptor, ctx.dialect()))
        }
    }
}
