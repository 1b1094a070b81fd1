//! Security scope functions
//!
//! Unlike most built-ins, a null argument here is a caller mistake and
//! produces usage text.

use super::native;
use crate::context::ActionContext;
use crate::error::{RegistryError, RuntimeError};
use crate::function::validate::require_non_null;
use crate::function::{Arity, Category, FunctionDescriptor, NativeFunction, NullPolicy};
use crate::security::Principal;
use crate::value::{Value, ValueMap};

/// Module owning interactive login
pub const UI_MODULE: &str = "ui";

fn flag_fn(
    name: &str,
    summary: &str,
    apply: fn(&mut ActionContext),
) -> Result<NativeFunction, RegistryError> {
    native(
        FunctionDescriptor::new(name, Category::Security)
            .arity(Arity::exact(0))
            .signature("")
            .summary(summary)
            .null_policy(NullPolicy::Usage),
        move |ctx: &mut ActionContext, _: &Value, _: &[Value]| {
            apply(ctx);
            Ok(Value::Null)
        },
    )
}

pub fn functions() -> Result<Vec<NativeFunction>, RegistryError> {
    Ok(vec![
        flag_fn(
            "disable_cascading_delete",
            "Disables cascading delete for the rest of the evaluation",
            |ctx| ctx.security_mut().set_cascading_delete(false),
        )?,
        flag_fn(
            "enable_cascading_delete",
            "Re-enables cascading delete",
            |ctx| ctx.security_mut().set_cascading_delete(true),
        )?,
        flag_fn(
            "disable_notifications",
            "Suppresses change notifications for the rest of the evaluation",
            |ctx| ctx.security_mut().set_notifications(false),
        )?,
        flag_fn(
            "enable_notifications",
            "Re-enables change notifications",
            |ctx| ctx.security_mut().set_notifications(true),
        )?,
        native(
            FunctionDescriptor::new("me", Category::Security)
                .arity(Arity::exact(0))
                .signature("")
                .summary("Returns the current principal, or null when anonymous"),
            |ctx, _, _| Ok(ctx.security().principal().map_or(Value::Null, principal_value)),
        )?,
        native(
            FunctionDescriptor::new("login", Category::Security)
                .module(UI_MODULE)
                .arity(Arity::exact(2))
                .signature("user, password")
                .summary("Authenticates and switches the evaluation to that principal")
                .description("Returns true on success. Failed attempts are audited and return false.")
                .param("user", "User name")
                .param("password", "Plain-text password")
                .example("\"admin\", \"secret\"")
                .null_policy(NullPolicy::Usage),
            login,
        )?,
    ])
}

pub(crate) fn principal_value(principal: &Principal) -> Value {
    let mut map = ValueMap::new();
    map.insert("id".to_string(), Value::string(principal.id.clone()));
    map.insert("name".to_string(), Value::string(principal.name.clone()));
    map.insert("superuser".to_string(), Value::Bool(principal.superuser));
    Value::map(map)
}

fn login(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let user = args[0].to_string();
    let authenticator = ctx.services().authenticator.clone();
    match authenticator.authenticate(&user, &args[1].to_string()) {
        Ok(principal) => {
            ctx.security_mut().set_principal(principal);
            Ok(Value::Bool(true))
        }
        Err(error) => {
            tracing::warn!(user = %user, error = %error, "login rejected");
            Ok(Value::Bool(false))
        }
    }
}
