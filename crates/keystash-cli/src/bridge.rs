//! Bridge from `keystash_config::Config` to a running [`Stash`].
//!
//! Each backend kind is instantiated at most once, so slots configured
//! with the same kind share one adapter (and one `init`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use keystash::{
    Backend, CookieBackend, EnvBackend, FileBackend, MemoryBackend, Slot, Stash, StashOptions,
};
use keystash_config::{BackendKind, Config};
use keystash_telemetry::{LogConfig, LogFormat};

/// Convert the `[logging]` section to a [`LogConfig`].
#[must_use]
pub fn to_log_config(cfg: &Config) -> LogConfig {
    let format = cfg
        .logging
        .format
        .parse::<LogFormat>()
        .unwrap_or_default();

    let mut log_config = LogConfig::new(&cfg.logging.level).with_format(format);
    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }
    log_config
}

/// Directory backing `file` slots.
///
/// # Errors
///
/// Returns an error if `stash.data_dir` is unset and the platform has no
/// data directory.
pub fn data_dir(cfg: &Config) -> Result<PathBuf> {
    match &cfg.stash.data_dir {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => keystash::default_data_dir()
            .ok_or_else(|| anyhow!("could not determine a data directory; set stash.data_dir")),
    }
}

/// Per-call options every command starts from.
///
/// # Errors
///
/// Returns an error if `stash.force_backend` names no slot.
pub fn default_options(cfg: &Config) -> Result<StashOptions> {
    let mut options = StashOptions::new();
    if let Some(slot) = &cfg.stash.force_backend {
        options = options.with_backend(parse_slot(slot)?);
    }
    Ok(options)
}

/// Build and initialize the stash described by `cfg`.
///
/// # Errors
///
/// Returns an error if an adapter cannot be created (missing data dir,
/// unreadable or malformed env model) or if initialization fails.
pub fn build_stash(cfg: &Config) -> Result<Stash> {
    let mut adapters: HashMap<BackendKind, Arc<dyn Backend>> = HashMap::new();
    let mut builder = Stash::builder();
    if let Some(id) = &cfg.stash.id {
        builder = builder.id(id);
    }

    for (name, kind) in cfg.backends.slots() {
        let backend = match adapters.get(&kind) {
            Some(existing) => Arc::clone(existing),
            None => {
                let Some(created) = make_backend(kind, cfg)? else {
                    continue;
                };
                adapters.insert(kind, Arc::clone(&created));
                created
            },
        };
        builder = builder.slot(parse_slot(name)?, backend);
    }

    builder.build().context("failed to initialize stash")
}

fn make_backend(kind: BackendKind, cfg: &Config) -> Result<Option<Arc<dyn Backend>>> {
    let backend: Arc<dyn Backend> = match kind {
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
        BackendKind::File => Arc::new(FileBackend::new(data_dir(cfg)?)),
        BackendKind::Cookie => Arc::new(CookieBackend::new()),
        BackendKind::Env => {
            let path = cfg
                .backends
                .env_model
                .as_deref()
                .ok_or_else(|| anyhow!("backends.env_model is required for the env backend"))?;
            Arc::new(load_env_model(Path::new(path))?)
        },
        BackendKind::Unbound => return Ok(None),
    };
    tracing::debug!(kind = %kind, "created backend");
    Ok(Some(backend))
}

/// Load an env model file. `.json` files are parsed as JSON, anything
/// else as TOML.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid model.
pub fn load_env_model(path: &Path) -> Result<EnvBackend> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read env model {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let backend = if is_json {
        EnvBackend::from_json_str(&source)
    } else {
        EnvBackend::from_toml_str(&source)
    };
    backend.with_context(|| format!("invalid env model {}", path.display()))
}

fn parse_slot(name: &str) -> Result<Slot> {
    name.parse::<Slot>().map_err(|e| anyhow!(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> Config {
        let mut cfg = Config::default();
        cfg.stash.id = Some("app".into());
        cfg.stash.data_dir = Some(dir.display().to_string());
        cfg
    }

    #[test]
    fn test_default_config_binds_file_and_memory() {
        let dir = tempfile::tempdir().unwrap();
        let stash = build_stash(&config_in(dir.path())).unwrap();

        assert_eq!(stash.id(), Some("app"));
        assert_eq!(stash.backend(Slot::Native).unwrap().name(), "file");
        assert_eq!(stash.backend(Slot::Ssr).unwrap().name(), "file");
        assert_eq!(stash.backend(Slot::Web).unwrap().name(), "memory");
        assert!(Arc::ptr_eq(
            stash.backend(Slot::Native).unwrap(),
            stash.backend(Slot::Ssr).unwrap()
        ));
    }

    #[test]
    fn test_unbound_slot_is_left_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config_in(dir.path());
        cfg.backends.web = BackendKind::Unbound;

        let stash = build_stash(&cfg).unwrap();
        assert!(stash.backend(Slot::Web).is_none());
    }

    #[test]
    fn test_force_backend_becomes_default_option() {
        let mut cfg = Config::default();
        assert_eq!(default_options(&cfg).unwrap().backend, None);

        cfg.stash.force_backend = Some("web".into());
        assert_eq!(default_options(&cfg).unwrap().backend, Some(Slot::Web));

        cfg.stash.force_backend = Some("server".into());
        assert!(default_options(&cfg).is_err());
    }

    #[test]
    fn test_env_model_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.toml");
        std::fs::write(&model, "[port]\nenv = \"APP_PORT\"\nformat = \"number\"\ndefault = 8080\n")
            .unwrap();

        let mut cfg = config_in(dir.path());
        cfg.backends.ssr = BackendKind::Env;
        cfg.backends.env_model = Some(model.display().to_string());

        let stash = build_stash(&cfg).unwrap();
        assert_eq!(stash.backend(Slot::Ssr).unwrap().name(), "env");
    }

    #[test]
    fn test_missing_env_model_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config_in(dir.path());
        cfg.backends.native = BackendKind::Env;
        cfg.backends.env_model = Some(dir.path().join("absent.toml").display().to_string());

        assert!(build_stash(&cfg).is_err());
    }

    #[test]
    fn test_to_log_config() {
        let mut cfg = Config::default();
        cfg.logging.level = "debug".into();
        cfg.logging.format = "json".into();
        cfg.logging.directives = vec!["keystash=trace".into()];

        let log = to_log_config(&cfg);
        assert_eq!(log.level, "debug");
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.directives, vec!["keystash=trace"]);
    }
}
