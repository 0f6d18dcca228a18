//! `get`, `set`, `delete` and `clear` against a configured stash.

use std::io::Write;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use keystash::{Stash, StashOptions};
use serde_json::Value;

/// How a value is read or written on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ValueKind {
    /// `true` / `false`.
    Bool,
    /// A finite number.
    Number,
    /// Raw text, stored as a string.
    String,
    /// JSON; text that is not valid JSON is stored as a string.
    #[default]
    Json,
}

/// Parse a command-line value as `kind`.
///
/// # Errors
///
/// Returns an error if `raw` is not a valid `bool` or number.
pub fn parse_value(raw: &str, kind: ValueKind) -> Result<Value> {
    match kind {
        ValueKind::Bool => {
            let flag: bool = raw
                .parse()
                .with_context(|| format!("'{raw}' is not a boolean"))?;
            Ok(Value::Bool(flag))
        },
        ValueKind::Number => {
            let number: f64 = raw
                .parse()
                .with_context(|| format!("'{raw}' is not a number"))?;
            serde_json::Number::from_f64(number)
                .map(Value::Number)
                .with_context(|| format!("'{raw}' is not a finite number"))
        },
        ValueKind::String => Ok(Value::String(raw.to_owned())),
        ValueKind::Json => {
            Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned())))
        },
    }
}

/// Print the value stored under `key`.
///
/// # Errors
///
/// Returns an error if the key is absent and no default was given, or if
/// the stash call fails.
pub async fn get(
    stash: &Stash,
    key: &str,
    kind: ValueKind,
    options: &StashOptions,
    out: &mut impl Write,
) -> Result<()> {
    let rendered = match kind {
        ValueKind::Bool => stash
            .get_boolean_async(key, options)
            .await?
            .map(|v| v.to_string()),
        ValueKind::Number => stash
            .get_number_async(key, options)
            .await?
            .map(|v| v.to_string()),
        ValueKind::String => stash.get_string_async(key, options).await?,
        ValueKind::Json => stash
            .get_async::<Value>(key, options)
            .await?
            .map(|v| v.to_string()),
    };

    let Some(rendered) = rendered else {
        bail!("key '{key}' is not set");
    };
    writeln!(out, "{rendered}")?;
    Ok(())
}

/// Store `raw` under `key`, parsed as `kind`.
///
/// # Errors
///
/// Returns an error if `raw` does not parse or the stash call fails.
pub async fn set(
    stash: &Stash,
    key: &str,
    raw: &str,
    kind: ValueKind,
    options: &StashOptions,
) -> Result<()> {
    let value = parse_value(raw, kind)?;
    stash.set_async(key, &value, options).await?;
    tracing::info!(key, "value stored");
    Ok(())
}

/// Remove `key`.
///
/// # Errors
///
/// Returns an error if the stash call fails.
pub async fn delete(stash: &Stash, key: &str, options: &StashOptions) -> Result<()> {
    stash.delete_async(key, options).await?;
    Ok(())
}

/// Erase every key in the stash's namespace.
///
/// # Errors
///
/// Returns an error if the routed backend cannot bulk-erase.
pub async fn clear(stash: &Stash, options: &StashOptions) -> Result<()> {
    stash.clear_all_async(options).await?;
    Ok(())
}
