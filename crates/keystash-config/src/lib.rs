#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for keystash.
//!
//! Describes which backend kind each slot binds to, the facade namespace,
//! the data directory for file storage, and logging.
//!
//! # Usage
//!
//! ```rust,no_run
//! use keystash_config::Config;
//!
//! // defaults → config file → KEYSTASH_* env fallbacks
//! let resolved = Config::load(None).unwrap();
//! println!("web slot: {}", resolved.config.backends.web);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Config file** (explicit path, or `config.toml` in the platform
//!    config directory)
//! 2. **Environment variables** (`KEYSTASH_*`), fallback only
//! 3. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! # Design
//!
//! This crate has **no dependencies on other internal keystash crates**.
//! Turning a [`Config`] into a running stash happens in the CLI bridge.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging with source tracking.
pub mod merge;
/// Resolved configuration display and serialization.
pub mod show;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult, ConfigSource};
pub use merge::ConfigLayer;
pub use show::{ResolvedConfig, ShowFormat};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`] for the algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a config file is malformed or the final
    /// configuration fails validation.
    pub fn load(config_file: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(config_file, None)
    }

    /// Load configuration, looking for `config.toml` in `config_dir`
    /// instead of the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a config file is malformed or the final
    /// configuration fails validation.
    pub fn load_from_dir(config_dir: &std::path::Path) -> ConfigResult<ResolvedConfig> {
        loader::load(None, Some(config_dir))
    }

    /// Load configuration from a single file (no layering).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
