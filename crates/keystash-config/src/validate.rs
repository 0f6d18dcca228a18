//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges and that cross-field invariants hold.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{BackendKind, Config};

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_stash(config)?;
    validate_backends(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_stash(config: &Config) -> ConfigResult<()> {
    let s = &config.stash;

    if let Some(id) = &s.id {
        if id.is_empty() {
            return Err(invalid("stash.id", "id must not be empty"));
        }
        if id.contains('_') || id.contains('\0') {
            return Err(invalid(
                "stash.id",
                format!("id '{id}' must not contain '_' or null bytes"),
            ));
        }
    }

    if s.data_dir.as_deref().is_some_and(str::is_empty) {
        return Err(invalid("stash.data_dir", "data_dir must not be empty"));
    }

    if let Some(slot) = &s.force_backend {
        if !matches!(slot.as_str(), "native" | "ssr" | "web") {
            return Err(invalid(
                "stash.force_backend",
                format!("unknown slot '{slot}'; expected one of: native, ssr, web"),
            ));
        }
        let kind = config
            .backends
            .slots()
            .into_iter()
            .find_map(|(name, kind)| (name == slot).then_some(kind));
        if kind == Some(BackendKind::Unbound) {
            return Err(invalid(
                "stash.force_backend",
                format!("slot '{slot}' is forced but its backend is 'none'"),
            ));
        }
    }

    Ok(())
}

fn validate_backends(config: &Config) -> ConfigResult<()> {
    let b = &config.backends;

    let uses_env = b
        .slots()
        .iter()
        .any(|(_, kind)| *kind == BackendKind::Env);
    match b.env_model.as_deref() {
        Some("") => Err(invalid("backends.env_model", "env_model must not be empty")),
        None if uses_env => Err(invalid(
            "backends.env_model",
            "an 'env' backend is configured but no env_model file is set",
        )),
        _ => Ok(()),
    }
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.to_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        ));
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json") {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: pretty, compact, json",
                l.format
            ),
        ));
    }

    if l.directives.iter().any(|d| d.trim().is_empty()) {
        return Err(invalid("logging.directives", "directives must not be empty"));
    }

    Ok(())
}
