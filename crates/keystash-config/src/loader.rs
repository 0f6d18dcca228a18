//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge the config file: the explicit path if given, otherwise
//!    `{config dir}/config.toml` when it exists
//! 3. Apply `KEYSTASH_*` env var fallbacks for fields no file set
//! 4. Resolve `${VAR}` references
//! 5. Deserialize merged tree → `Config`
//! 6. Validate
//! 7. Return `ResolvedConfig`

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars, resolve_env_references};
use crate::error::{ConfigError, ConfigResult, ConfigSource};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load the layered configuration using the process environment.
///
/// `config_file` names an explicit file that must exist. Without it,
/// `config.toml` under `config_dir_override` (or the platform config
/// directory) is merged when present.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a config file is unreadable or malformed,
/// or if the final merged configuration fails validation.
pub fn load(
    config_file: Option<&Path>,
    config_dir_override: Option<&Path>,
) -> ConfigResult<ResolvedConfig> {
    load_with_env(config_file, config_dir_override, &collect_env_vars())
}

/// Like [`load`], reading `KEYSTASH_*` fallbacks and `${VAR}` references
/// from `env_vars` instead of the process environment.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: BuildHasher>(
    config_file: Option<&Path>,
    config_dir_override: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    // 1. Parse embedded defaults.
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::Malformed {
            origin: ConfigSource::Defaults,
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    // 2. Config file.
    let file_layer = match config_file {
        Some(path) => {
            let overlay = try_load_file(path)?.ok_or_else(|| not_found(path))?;
            Some((overlay, path.to_path_buf()))
        },
        None => {
            let dir = match config_dir_override {
                Some(dir) => dir.to_path_buf(),
                None => config_directory()?,
            };
            let path = dir.join("config.toml");
            try_load_file(&path)?.map(|overlay| (overlay, path))
        },
    };

    if let Some((overlay, path)) = file_layer {
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::File,
            &mut field_sources,
        );
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded config file");
    }

    // 3. Env var fallbacks.
    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    // 4–5. Resolve ${VAR} references in string values, then deserialize.
    resolve_env_references(&mut merged, env_vars);
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Malformed {
                origin: ConfigSource::Merged,
                source: e,
            })?;

    // 6. Validate.
    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a specific file path (no layering).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let overlay = try_load_file(path)?.ok_or_else(|| not_found(path))?;

    let config: Config = overlay
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Malformed {
            origin: ConfigSource::File(path.to_path_buf()),
            source: e,
        })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Path of the user config file in the platform config directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoConfigDir`] if the platform has no config
/// directory for the current user.
pub fn user_config_path() -> ConfigResult<PathBuf> {
    Ok(config_directory()?.join("config.toml"))
}

fn not_found(path: &Path) -> ConfigError {
    ConfigError::Unreadable {
        path: path.to_path_buf(),
        source: io::Error::from(io::ErrorKind::NotFound),
    }
}

fn config_directory() -> ConfigResult<PathBuf> {
    directories::ProjectDirs::from("", "", "keystash")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(ConfigError::NoConfigDir)
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Uses a single read so there is no gap between a size check and the read.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::Unreadable {
                path: path.to_path_buf(),
                source: e,
            });
        },
    };

    let size = content.len() as u64;
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit: MAX_CONFIG_FILE_SIZE,
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::Malformed {
        origin: ConfigSource::File(path.to_path_buf()),
        source: e,
    })?;

    Ok(Some(value))
}
