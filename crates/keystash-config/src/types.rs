//! Configuration types.
//!
//! All sections use `#[serde(default)]` so a config file only needs the
//! fields it changes. String-typed fields are checked by
//! [`validate`](crate::validate::validate) after the layers are merged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level keystash configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Facade identity and routing.
    pub stash: StashSection,
    /// Backend kind bound to each slot.
    pub backends: BackendsSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// StashSection
// ---------------------------------------------------------------------------

/// Facade identity and routing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StashSection {
    /// Namespace identifier prefixed to every key.
    pub id: Option<String>,
    /// Directory for file-backed storage. `None` uses the platform data dir.
    pub data_dir: Option<String>,
    /// Slot every call is routed to (`"native"`, `"ssr"` or `"web"`).
    /// `None` routes by runtime classification.
    pub force_backend: Option<String>,
}

// ---------------------------------------------------------------------------
// BackendsSection
// ---------------------------------------------------------------------------

/// Which adapter a slot is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Volatile in-memory map.
    Memory,
    /// Durable JSON file under the data directory.
    File,
    /// Request cookie jar.
    Cookie,
    /// Read-only environment model.
    Env,
    /// Leave the slot unbound.
    #[serde(rename = "none")]
    Unbound,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Cookie => "cookie",
            Self::Env => "env",
            Self::Unbound => "none",
        })
    }
}

/// Backend kind bound to each slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsSection {
    /// Native mobile slot.
    pub native: BackendKind,
    /// Server-side slot.
    pub ssr: BackendKind,
    /// Web client slot.
    pub web: BackendKind,
    /// Model file (TOML or JSON) for slots of kind [`BackendKind::Env`].
    pub env_model: Option<String>,
}

impl Default for BackendsSection {
    fn default() -> Self {
        Self {
            native: BackendKind::File,
            ssr: BackendKind::File,
            web: BackendKind::Memory,
            env_model: None,
        }
    }
}

impl BackendsSection {
    /// `(slot name, kind)` for every slot, in routing precedence order.
    #[must_use]
    pub fn slots(&self) -> [(&'static str, BackendKind); 3] {
        [
            ("native", self.native),
            ("ssr", self.ssr),
            ("web", self.web),
        ]
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"` or `"json"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["keystash_storage=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
