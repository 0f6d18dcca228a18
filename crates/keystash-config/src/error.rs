//! Errors raised while loading keystash configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Where a TOML document that failed to parse came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// The `defaults.toml` compiled into the crate.
    Defaults,
    /// A config file on disk.
    File(PathBuf),
    /// The tree after every layer was merged and `${VAR}`s resolved.
    Merged,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => f.write_str("embedded defaults"),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Merged => f.write_str("merged configuration"),
        }
    }
}

/// Keystash configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file could not be read. An explicit `--config` path that
    /// does not exist lands here too.
    #[error("cannot read keystash config {}: {source}", path.display())]
    Unreadable {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A config file exceeds the size limit.
    #[error("keystash config {} is {size} bytes (limit {limit})", path.display())]
    TooLarge {
        /// Offending file.
        path: PathBuf,
        /// Its size in bytes.
        size: u64,
        /// Largest accepted size in bytes.
        limit: u64,
    },

    /// A layer is not valid TOML, or the merged tree does not fit [`Config`].
    ///
    /// [`Config`]: crate::Config
    #[error("malformed keystash config ({origin}): {source}")]
    Malformed {
        /// Layer the document came from.
        origin: ConfigSource,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A setting has a value keystash cannot use.
    #[error("invalid `{field}`: {message}")]
    Invalid {
        /// Dotted path of the setting, e.g. `stash.force_backend`.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// No per-user config directory exists on this platform; pass an
    /// explicit config file instead.
    #[error("no keystash config directory on this platform; pass --config")]
    NoConfigDir,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
