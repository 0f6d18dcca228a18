//! Source-annotated display for `config show`.

use std::fmt::{self, Write as _};

use crate::merge::FieldSources;
use crate::types::Config;

/// A resolved configuration together with source annotations.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final merged configuration.
    pub config: Config,
    /// Dotted field path → which layer set the value.
    pub field_sources: FieldSources,
    /// Config file paths that were loaded.
    pub loaded_files: Vec<String>,
}

/// Output format for `config show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowFormat {
    /// TOML with inline comments showing source.
    Toml,
    /// JSON (for programmatic consumption).
    Json,
}

impl ResolvedConfig {
    /// Render the resolved config.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn show(&self, format: ShowFormat) -> Result<String, fmt::Error> {
        match format {
            ShowFormat::Toml => self.show_toml(),
            ShowFormat::Json => serde_json::to_string_pretty(&self.config).map_err(|_| fmt::Error),
        }
    }

    fn show_toml(&self) -> Result<String, fmt::Error> {
        let toml_str = toml::to_string_pretty(&self.config).map_err(|_| fmt::Error)?;

        let mut output = String::new();
        output.push_str("# Resolved keystash configuration\n");
        output.push_str("# Source annotations: [defaults] [file] [env]\n");
        for path in &self.loaded_files {
            writeln!(output, "# Loaded: {path}")?;
        }
        output.push('\n');

        let mut section = String::new();
        for line in toml_str.lines() {
            let trimmed = line.trim();
            if let Some(name) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                section = name.to_owned();
            }
            match self.annotate_line(trimmed, &section) {
                Some(annotation) => writeln!(output, "{line}  # {annotation}")?,
                None => writeln!(output, "{line}")?,
            }
        }

        Ok(output)
    }

    /// Source annotation for a `key = value` line in `section`.
    fn annotate_line(&self, line: &str, section: &str) -> Option<String> {
        if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
            return None;
        }
        let key = line.split('=').next()?.trim();
        let field_path = if section.is_empty() {
            key.to_owned()
        } else {
            format!("{section}.{key}")
        };
        self.field_sources
            .get(&field_path)
            .map(|layer| format!("[{layer}]"))
    }
}
