//! Environment variable fallback and `${VAR}` reference resolution.
//!
//! Environment variables are a **fallback**, not an override: they only
//! fill fields that no config file set. Embedded defaults yield to them,
//! a value written in a config file never does.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::hash::BuildHasher;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// All supported `KEYSTASH_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "KEYSTASH_ID",
        field_path: "stash.id",
    },
    EnvMapping {
        var_name: "KEYSTASH_DATA_DIR",
        field_path: "stash.data_dir",
    },
    EnvMapping {
        var_name: "KEYSTASH_BACKEND",
        field_path: "stash.force_backend",
    },
    EnvMapping {
        var_name: "KEYSTASH_ENV_MODEL",
        field_path: "backends.env_model",
    },
    EnvMapping {
        var_name: "KEYSTASH_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "KEYSTASH_LOG_FORMAT",
        field_path: "logging.format",
    },
];

/// Apply environment variable fallbacks to fields that no config file set.
///
/// A field counts as set when `sources` records it with any layer other
/// than [`ConfigLayer::Defaults`]. Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults)
        {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );
            set_field(merged, mapping.field_path, toml::Value::String(val.clone()));
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Resolve `${VAR}` references within string values in the config tree.
///
/// References that don't resolve are left as-is.
pub fn resolve_env_references<S: BuildHasher>(
    val: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) {
    match val {
        toml::Value::String(s) => {
            if s.contains("${") {
                *s = resolve_string_refs(s, env_vars);
            }
        },
        toml::Value::Table(table) => {
            for (_, child) in table.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        toml::Value::Array(arr) => {
            for child in arr.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        _ => {},
    }
}

fn resolve_string_refs<S: BuildHasher>(input: &str, env_vars: &HashMap<String, String, S>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        let (before, tail) = rest.split_at(start);
        result.push_str(before);
        let body = tail.strip_prefix("${").unwrap_or(tail);
        let Some(end) = body.find('}') else {
            // Unterminated, keep the remainder verbatim.
            result.push_str(tail);
            return result;
        };
        let (name, after) = body.split_at(end);
        match env_vars.get(name) {
            Some(value) if !name.is_empty() => result.push_str(value),
            _ => {
                debug!(var = name, "unresolved env var reference in config");
                let _ = write!(result, "${{{name}}}");
            },
        }
        rest = after.strip_prefix('}').unwrap_or(after);
    }

    result.push_str(rest);
    result
}

/// Set a dotted field in the TOML tree, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, val: toml::Value) {
    let mut current = root;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), val);
            return;
        }
        current = table
            .entry(segment.to_owned())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
