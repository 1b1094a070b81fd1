//! Configuration, logging, environment and symmetric encryption
//!
//! `encrypt`/`decrypt` use AES-256-GCM with a key derived from the
//! configured secret (SHA-256). The ciphertext is base64 of nonce followed by
//! the sealed message.

use super::{native, optional};
use crate::context::ActionContext;
use crate::convert::CoercionError;
use crate::error::{RegistryError, RuntimeError};
use crate::function::validate::{require_non_null, require_non_null_at};
use crate::function::{Arity, Category, FunctionDescriptor, NativeFunction};
use crate::security::SecurityError;
use crate::value::Value;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

/// Module owning `encrypt` and `decrypt`
pub const CRYPTO_MODULE: &str = "crypto";

const NONCE_LEN: usize = 12;

pub fn functions() -> Result<Vec<NativeFunction>, RegistryError> {
    Ok(vec![
        native(
            FunctionDescriptor::new("config", Category::System)
                .arity(Arity::range(1, 2))
                .signature("key [, default ]")
                .summary("Returns a configuration setting")
                .description("Settings come from the [settings] table of quill.toml, keys joined with dots.")
                .param("key", "Setting key such as mail.host")
                .optional_param("default", "Returned when the key is not set")
                .example("\"mail.host\", \"localhost\""),
            config,
        )?,
        native(
            FunctionDescriptor::new("set_log_level", Category::System)
                .arity(Arity::exact(1))
                .signature("level")
                .summary("Changes the runtime log filter")
                .description("Accepts a level such as debug or a filter such as quill_runtime=trace.")
                .example("\"debug\""),
            set_log_level,
        )?,
        native(
            FunctionDescriptor::new("env", Category::System)
                .arity(Arity::exact(1))
                .signature("name")
                .summary("Returns an environment variable")
                .description("Null when the variable is unset or the evaluation may not read it.")
                .example("\"APP_MODE\""),
            env,
        )?,
        native(
            FunctionDescriptor::new("encrypt", Category::System)
                .module(CRYPTO_MODULE)
                .arity(Arity::range(1, 2))
                .signature("text [, secret ]")
                .summary("Encrypts text with AES-256-GCM")
                .optional_param("secret", "Overrides the configured secret")
                .example("\"confidential\""),
            encrypt,
        )?,
        native(
            FunctionDescriptor::new("decrypt", Category::System)
                .module(CRYPTO_MODULE)
                .arity(Arity::range(1, 2))
                .signature("ciphertext [, secret ]")
                .summary("Decrypts text produced by encrypt()")
                .optional_param("secret", "Overrides the configured secret")
                .example("encrypt(\"confidential\")"),
            decrypt,
        )?,
    ])
}

fn config(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null_at(args, 0)?;
    let key = args[0].to_string();
    Ok(match ctx.services().settings.get(&key) {
        Some(value) => Value::string(value),
        None => optional(args, 1).cloned().unwrap_or(Value::Null),
    })
}

fn set_log_level(
    ctx: &mut ActionContext,
    _caller: &Value,
    args: &[Value],
) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let level = args[0].to_string();
    match ctx.services().log_control.set_level(&level) {
        Ok(()) => Ok(Value::Bool(true)),
        Err(reason) => {
            tracing::warn!(level = %level, reason = %reason, "log level unchanged");
            Ok(Value::Bool(false))
        }
    }
}

fn env(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null(args)?;
    let name = args[0].to_string();
    if let Err(error) = ctx.security().check_environment(&name) {
        tracing::warn!(var = %name, error = %error, "environment access denied");
        return Ok(Value::Null);
    }
    Ok(ctx
        .services()
        .environment
        .var(&name)
        .map_or(Value::Null, Value::string))
}

fn cipher(ctx: &ActionContext, args: &[Value]) -> Result<Aes256Gcm, RuntimeError> {
    let secret = match optional(args, 1) {
        Some(secret) => secret.to_string(),
        None => ctx
            .services()
            .secret()
            .map(str::to_string)
            .ok_or(SecurityError::MissingSecret)?,
    };
    let key = Sha256::digest(secret.as_bytes());
    Aes256Gcm::new_from_slice(&key)
        .map_err(|e| CoercionError::Crypto(e.to_string()).into())
}

fn encrypt(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null_at(args, 0)?;
    let cipher = cipher(ctx, args)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let sealed = cipher
        .encrypt(&nonce, args[0].to_string().as_bytes())
        .map_err(|e| CoercionError::Crypto(e.to_string()))?;

    let mut payload = Vec::with_capacity(NONCE_LEN + sealed.len());
    payload.extend_from_slice(&nonce);
    payload.extend_from_slice(&sealed);
    Ok(Value::string(STANDARD.encode(payload)))
}

fn decrypt(ctx: &mut ActionContext, _caller: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
    require_non_null_at(args, 0)?;
    let cipher = cipher(ctx, args)?;
    let payload = STANDARD
        .decode(args[0].to_string().trim())
        .map_err(|e| CoercionError::Encoding(e.to_string()))?;
    if payload.len() <= NONCE_LEN {
        return Err(CoercionError::Crypto("ciphertext too short".to_string()).into());
    }
    let (nonce, sealed) = payload.split_at(NONCE_LEN);
    let plain = cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| CoercionError::Crypto("authentication failed".to_string()))?;
    let text = String::from_utf8(plain).map_err(|e| CoercionError::Encoding(e.to_string()))?;
    Ok(Value::string(text))
}

#[cfg(test)]
mod tests {
    use crate::builtins::test_support::{call, context, context_with, eval};
    use crate::error::RuntimeError;
    use crate::function::{FunctionRegistry, Licensing};
    use crate::services::{LogControl, MapEnvironment, MemoryLogControl, Services, Settings};
    use crate::value::Value;
    use crate::ActionContext;
    use std::sync::Arc;

    #[test]
    fn test_config_lookup_with_default() {
        let settings: Settings = vec![("mail.host".to_string(), "smtp.local".to_string())]
            .into_iter()
            .collect();
        let mut ctx = context_with(Services::default().with_settings(settings));
        assert_eq!(
            eval(&mut ctx, "config", &[Value::from("mail.host")]),
            Value::from("smtp.local")
        );
        assert_eq!(
            eval(&mut ctx, "config", &[Value::from("mail.port"), Value::Integer(25)]),
            Value::Integer(25)
        );
        assert_eq!(eval(&mut ctx, "config", &[Value::from("mail.port")]), Value::Null);
    }

    #[test]
    fn test_set_log_level_uses_log_control() {
        let control = Arc::new(MemoryLogControl::default());
        let mut ctx = context_with(Services::default().with_log_control(control.clone()));
        assert_eq!(
            eval(&mut ctx, "set_log_level", &[Value::from("debug")]),
            Value::Bool(true)
        );
        assert_eq!(control.current_level(), "debug");
        assert_eq!(
            eval(&mut ctx, "set_log_level", &[Value::from("")]),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_env_requires_grant() {
        let environment = MapEnvironment::new()
            .with_var("APP_MODE", "test")
            .with_var("SECRET_TOKEN", "hunter2");
        let services = Services::default()
            .with_environment(Arc::new(environment))
            .with_environment_grants(["APP_*"]);
        let mut ctx = context_with(services);

        assert_eq!(eval(&mut ctx, "env", &[Value::from("APP_MODE")]), Value::from("test"));
        assert_eq!(eval(&mut ctx, "env", &[Value::from("SECRET_TOKEN")]), Value::Null);
        assert_eq!(eval(&mut ctx, "env", &[Value::from("APP_OTHER")]), Value::Null);
        assert_eq!(
            eval(&mut ctx, "call_privileged", &[Value::from("env"), Value::from("SECRET_TOKEN")]),
            Value::from("hunter2")
        );
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let mut ctx = context_with(Services::default().with_secret("s3cret"));
        let sealed = eval(&mut ctx, "encrypt", &[Value::from("confidential")]);
        assert_ne!(sealed, Value::from("confidential"));
        assert_eq!(
            eval(&mut ctx, "decrypt", &[sealed.clone()]),
            Value::from("confidential")
        );

        let wrong = eval(&mut ctx, "decrypt", &[sealed, Value::from("other")]);
        assert_eq!(wrong, Value::from("Crypto failure: authentication failed"));
    }

    #[test]
    fn test_encrypt_without_secret_is_null() {
        let mut ctx = context();
        assert_eq!(eval(&mut ctx, "encrypt", &[Value::from("x")]), Value::Null);
    }

    #[test]
    fn test_crypto_requires_license() {
        let registry = FunctionRegistry::with_builtins(Licensing::core_only()).unwrap();
        let mut ctx = ActionContext::new(Arc::new(registry), Arc::new(Services::default()));
        assert_eq!(
            call(&mut ctx, "encrypt", &[Value::from("x")]),
            Err(RuntimeError::Unlicensed {
                function: "encrypt".to_string(),
                module: "crypto".to_string()
            })
        );
    }
}
