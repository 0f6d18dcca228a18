//! Layered merging with per-field source tracking.

use std::collections::HashMap;
use std::fmt;

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// The user or explicitly given config file.
    File,
    /// Environment variable fallback.
    Environment,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::File => write!(f, "file"),
            Self::Environment => write!(f, "env"),
        }
    }
}

/// Tracks which layer set each field's value.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// Deep-merge `overlay` into `base`, recording which layer set each leaf
/// field. Tables merge per field; scalars and arrays replace.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = join(prefix, key);
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                    record_leaves(overlay_val, &path, layer, sources);
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            record_leaves(overlay, prefix, layer, sources);
        },
    }
}

/// Record every leaf path under `val` as set by `layer`.
pub fn record_leaves(val: &toml::Value, prefix: &str, layer: &ConfigLayer, sources: &mut FieldSources) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_leaves(child, &join(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer.clone());
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_replaces_scalars_and_tracks_source() {
        let mut base: toml::Value =
            toml::from_str("[backends]\nnative = \"file\"\nweb = \"memory\"").unwrap();
        let overlay: toml::Value = toml::from_str("[backends]\nweb = \"none\"").unwrap();

        let mut sources = FieldSources::new();
        record_leaves(&base, "", &ConfigLayer::Defaults, &mut sources);
        deep_merge_tracking(&mut base, &overlay, "", &ConfigLayer::File, &mut sources);

        assert_eq!(base["backends"]["web"].as_str(), Some("none"));
        assert_eq!(base["backends"]["native"].as_str(), Some("file"));
        assert_eq!(sources.get("backends.web"), Some(&ConfigLayer::File));
        assert_eq!(sources.get("backends.native"), Some(&ConfigLayer::Defaults));
    }

    #[test]
    fn test_new_tables_are_recorded() {
        let mut base: toml::Value = toml::from_str("[logging]\nlevel = \"info\"").unwrap();
        let overlay: toml::Value = toml::from_str("[stash]\nid = \"app\"").unwrap();

        let mut sources = FieldSources::new();
        deep_merge_tracking(&mut base, &overlay, "", &ConfigLayer::File, &mut sources);

        assert_eq!(base["stash"]["id"].as_str(), Some("app"));
        assert_eq!(sources.get("stash.id"), Some(&ConfigLayer::File));
    }
}
