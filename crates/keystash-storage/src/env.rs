//! Read-only backend over environment variables.
//!
//! The backend is described by an [`EnvModel`]: a tree of groups whose
//! leaves name an environment variable, an optional default and a format.
//! Dotted keys address leaves (`db.port`), and a group read returns its
//! resolved subtree as JSON text.
//!
//! ```toml
//! [db.host]
//! env = "DB_HOST"
//! default = "localhost"
//!
//! [db.port]
//! env = "DB_PORT"
//! format = "number"
//! default = 5432
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::backend::{Backend, Capabilities, InitOptions, namespace_prefix};
use crate::error::{StashError, StashResult};
use crate::options::StashOptions;
use crate::value::StashValue;

/// Separator between path segments in a key.
const PATH_SEPARATOR: char = '.';

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// How a variable's text is turned into a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvFormat {
    /// Keep the raw text.
    #[default]
    String,
    /// `true`/`false` (also `1`/`0`, `yes`/`no`).
    Boolean,
    /// A decimal number.
    Number,
    /// A JSON document.
    Json,
}

/// A leaf of the model: one environment variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvItem {
    /// Name of the environment variable.
    pub env: String,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Value used when the variable is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Format applied to the variable's text.
    #[serde(default)]
    pub format: EnvFormat,
}

impl EnvItem {
    /// An item reading `env` as a plain string.
    #[must_use]
    pub fn new(env: impl Into<String>) -> Self {
        Self {
            env: env.into(),
            doc: None,
            default: None,
            format: EnvFormat::default(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Set the fallback value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the format.
    #[must_use]
    pub fn with_format(mut self, format: EnvFormat) -> Self {
        self.format = format;
        self
    }

    fn parse(&self, raw: &str) -> StashResult<Value> {
        let invalid = |expected: &str| {
            StashError::decode(
                &self.env,
                format!("'{raw}' is not a valid {expected}"),
            )
        };
        match self.format {
            EnvFormat::String => Ok(Value::String(raw.to_owned())),
            EnvFormat::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "no" => Ok(Value::Bool(false)),
                _ => Err(invalid("boolean")),
            },
            EnvFormat::Number => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| invalid("number")),
            EnvFormat::Json => serde_json::from_str(raw).map_err(|e| {
                StashError::decode(&self.env, format!("invalid JSON: {e}"))
            }),
        }
    }
}

/// A node of the environment model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvModel {
    /// A single variable.
    Item(EnvItem),
    /// Named children.
    Group(BTreeMap<String, EnvModel>),
}

impl EnvModel {
    /// A group from `(name, node)` pairs.
    #[must_use]
    pub fn group<K: Into<String>>(children: impl IntoIterator<Item = (K, EnvModel)>) -> Self {
        Self::Group(
            children
                .into_iter()
                .map(|(name, node)| (name.into(), node))
                .collect(),
        )
    }

    fn validate(&self, path: &str) -> StashResult<()> {
        match self {
            Self::Item(item) => {
                if item.env.is_empty() || item.env.contains(['=', '\0']) {
                    return Err(StashError::InvalidModel(format!(
                        "'{path}' names an invalid variable '{}'",
                        item.env
                    )));
                }
                Ok(())
            },
            Self::Group(children) => {
                for (name, child) in children {
                    if name.is_empty() || name.contains(PATH_SEPARATOR) || name == "env" {
                        return Err(StashError::InvalidModel(format!(
                            "invalid group member '{name}' under '{path}'"
                        )));
                    }
                    let child_path = if path.is_empty() {
                        name.clone()
                    } else {
                        format!("{path}{PATH_SEPARATOR}{name}")
                    };
                    child.validate(&child_path)?;
                }
                Ok(())
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct EnvState {
    /// Namespace prefix stripped from incoming keys.
    prefix: Option<String>,
    /// Resolved value tree, `None` until resolved.
    resolved: Option<Value>,
}

/// Read-only backend resolving an [`EnvModel`] against environment variables.
///
/// Variables come from the process environment unless a map is injected
/// with [`with_vars`](Self::with_vars).
///
/// # Example
///
/// ```rust
/// use keystash_storage::{Backend, EnvBackend, InitOptions, StashOptions};
///
/// # fn main() -> keystash_storage::StashResult<()> {
/// let backend = EnvBackend::from_toml_str(
///     r#"
///     [server.port]
///     env = "PORT"
///     format = "number"
///     default = 8080
///     "#,
/// )?
/// .with_vars([("PORT", "9000")]);
/// backend.init(&InitOptions::new())?;
///
/// assert_eq!(backend.get_number("server.port", &StashOptions::new())?, Some(9000.0));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct EnvBackend {
    model: EnvModel,
    vars: Option<HashMap<String, String>>,
    state: RwLock<EnvState>,
}

impl EnvBackend {
    /// Create a backend over `model`.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::InvalidModel`] if the root is not a group, a
    /// group member name is empty, contains `.` or is `env`, or an item's
    /// variable name is unusable.
    pub fn new(model: EnvModel) -> StashResult<Self> {
        if matches!(model, EnvModel::Item(_)) {
            return Err(StashError::InvalidModel(
                "the model root must be a group".into(),
            ));
        }
        model.validate("")?;
        Ok(Self {
            model,
            vars: None,
            state: RwLock::new(EnvState::default()),
        })
    }

    /// Parse a model from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::InvalidModel`] if the document does not describe
    /// a valid model.
    pub fn from_toml_str(source: &str) -> StashResult<Self> {
        let model: EnvModel =
            toml::from_str(source).map_err(|e| StashError::InvalidModel(e.to_string()))?;
        Self::new(model)
    }

    /// Parse a model from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::InvalidModel`] if the document does not describe
    /// a valid model.
    pub fn from_json_str(source: &str) -> StashResult<Self> {
        let model: EnvModel =
            serde_json::from_str(source).map_err(|e| StashError::InvalidModel(e.to_string()))?;
        Self::new(model)
    }

    /// Resolve variables from `vars` instead of the process environment.
    #[must_use]
    pub fn with_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// The model this backend resolves.
    #[must_use]
    pub fn model(&self) -> &EnvModel {
        &self.model
    }

    fn var(&self, name: &str) -> Option<String> {
        match &self.vars {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }

    fn resolve(&self, node: &EnvModel) -> StashResult<Option<Value>> {
        match node {
            EnvModel::Item(item) => match self.var(&item.env) {
                Some(raw) => item.parse(&raw).map(Some),
                None => Ok(item.default.clone()),
            },
            EnvModel::Group(children) => {
                let mut map = Map::new();
                for (name, child) in children {
                    if let Some(value) = self.resolve(child)? {
                        map.insert(name.clone(), value);
                    }
                }
                Ok(Some(Value::Object(map)))
            },
        }
    }

    fn lookup(&self, key: &str) -> StashResult<Option<Value>> {
        {
            let state = self
                .state
                .read()
                .map_err(|e| StashError::Internal(e.to_string()))?;
            if let Some(resolved) = &state.resolved {
                return Ok(Self::select(resolved, Self::strip(&state, key)));
            }
        }
        let mut state = self
            .state
            .write()
            .map_err(|e| StashError::Internal(e.to_string()))?;
        let resolved = self.resolve(&self.model)?.unwrap_or(Value::Null);
        let found = Self::select(&resolved, Self::strip(&state, key));
        state.resolved = Some(resolved);
        Ok(found)
    }

    fn strip<'a>(state: &EnvState, key: &'a str) -> &'a str {
        state
            .prefix
            .as_deref()
            .and_then(|prefix| key.strip_prefix(prefix))
            .unwrap_or(key)
    }

    fn select(resolved: &Value, key: &str) -> Option<Value> {
        key.split(PATH_SEPARATOR)
            .try_fold(resolved, |node, part| node.get(part))
            .cloned()
    }

    fn read_only(&self, operation: &'static str) -> StashError {
        StashError::UnsupportedOperation {
            backend: self.name(),
            operation,
        }
    }
}

impl Backend for EnvBackend {
    fn name(&self) -> &'static str {
        "env"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            read_only: true,
            typed_values: true,
            ..Capabilities::default()
        }
    }

    fn init(&self, options: &InitOptions) -> StashResult<()> {
        let resolved = self.resolve(&self.model)?.unwrap_or(Value::Null);
        let mut state = self
            .state
            .write()
            .map_err(|e| StashError::Internal(e.to_string()))?;
        state.prefix = options.namespace.as_deref().map(namespace_prefix);
        state.resolved = Some(resolved);
        debug!(backend = "env", "environment model resolved");
        Ok(())
    }

    fn clear_all(&self, _namespace: Option<&str>, _options: &StashOptions) -> StashResult<()> {
        Err(self.read_only("clear_all"))
    }

    fn delete(&self, _key: &str, _options: &StashOptions) -> StashResult<()> {
        Err(self.read_only("delete"))
    }

    fn get(&self, key: &str, _options: &StashOptions) -> StashResult<Option<StashValue>> {
        let Some(value) = self.lookup(key)? else {
            return Ok(None);
        };
        Ok(match value {
            Value::Null => None,
            Value::Bool(b) => Some(StashValue::Bool(b)),
            Value::Number(n) => n.as_f64().map(StashValue::Number),
            Value::String(s) => Some(StashValue::String(s)),
            structured @ (Value::Array(_) | Value::Object(_)) => {
                Some(StashValue::String(structured.to_string()))
            },
        })
    }

    fn set(&self, _key: &str, _value: StashValue, _options: &StashOptions) -> StashResult<()> {
        Err(self.read_only("set"))
    }
}
