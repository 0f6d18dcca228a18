//! `config show` and `config path`.

use std::io::Write;

use anyhow::{Result, anyhow};
use keystash_config::{ResolvedConfig, ShowFormat};

/// Print the resolved configuration with per-field source annotations.
///
/// # Errors
///
/// Returns an error if rendering or writing fails.
pub fn show_config(
    resolved: &ResolvedConfig,
    format: ShowFormat,
    out: &mut impl Write,
) -> Result<()> {
    let rendered = resolved
        .show(format)
        .map_err(|_| anyhow!("failed to render configuration"))?;
    write!(out, "{rendered}")?;
    if format == ShowFormat::Json {
        writeln!(out)?;
    }
    Ok(())
}

/// Print where the user config file is looked up.
///
/// # Errors
///
/// Returns an error if the platform has no config directory.
pub fn show_path(out: &mut impl Write) -> Result<()> {
    let path = keystash_config::loader::user_config_path()?;
    writeln!(out, "{}", path.display())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_config_json() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = keystash_config::Config::load_from_dir(dir.path()).unwrap();

        let mut out = Vec::new();
        show_config(&resolved, ShowFormat::Json, &mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["backends"]["web"], "memory");
    }
}
