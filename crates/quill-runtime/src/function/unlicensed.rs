//! Stand-in for functions whose module is not licensed

use crate::context::ActionContext;
use crate::error::RuntimeError;
use crate::function::descriptor::FunctionDescriptor;
use crate::function::Function;
use crate::value::Value;

/// Hidden placeholder that rejects every call
///
/// Carries the original name and required module so the error tells the
/// caller which module is missing.
#[derive(Debug, Clone)]
pub struct UnlicensedFunction {
    descriptor: FunctionDescriptor,
}

impl UnlicensedFunction {
    pub fn for_descriptor(original: &FunctionDescriptor) -> Self {
        Self {
            descriptor: original.as_placeholder(),
        }
    }
}

impl Function for UnlicensedFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    fn apply(
        &self,
        _ctx: &mut ActionContext,
        _caller: &Value,
        _args: &[Value],
    ) -> Result<Value, RuntimeError> {
        Err(RuntimeError::Unlicensed {
            function: self.descriptor.name().to_string(),
            module: self.descriptor.required_module().to_string(),
        })
    }
}
