//! Volatile in-memory backend.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::backend::{Backend, Capabilities, InitOptions, namespace_prefix};
use crate::error::{StashError, StashResult};
use crate::options::StashOptions;
use crate::value::StashValue;

/// In-memory string map for tests, ephemeral data and web clients.
///
/// Values are stored in their encoded string form, like a browser's
/// `localStorage`, so typed getters see exactly what a string medium would.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys across all namespaces.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::Internal`] if the lock is poisoned.
    pub fn len(&self) -> StashResult<usize> {
        let data = self
            .data
            .read()
            .map_err(|e| StashError::Internal(e.to_string()))?;
        Ok(data.len())
    }

    /// Whether the backend holds no keys.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::Internal`] if the lock is poisoned.
    pub fn is_empty(&self) -> StashResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            bulk_clear: true,
            ..Capabilities::default()
        }
    }

    fn init(&self, _options: &InitOptions) -> StashResult<()> {
        Ok(())
    }

    fn clear_all(&self, namespace: Option<&str>, _options: &StashOptions) -> StashResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StashError::Internal(e.to_string()))?;
        match namespace {
            Some(ns) => {
                let prefix = namespace_prefix(ns);
                data.retain(|k, _| !k.starts_with(&prefix));
            },
            None => data.clear(),
        }
        Ok(())
    }

    fn delete(&self, key: &str, _options: &StashOptions) -> StashResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StashError::Internal(e.to_string()))?;
        data.remove(key);
        Ok(())
    }

    fn get(&self, key: &str, _options: &StashOptions) -> StashResult<Option<StashValue>> {
        let data = self
            .data
            .read()
            .map_err(|e| StashError::Internal(e.to_string()))?;
        Ok(data.get(key).cloned().map(StashValue::String))
    }

    fn set(&self, key: &str, value: StashValue, _options: &StashOptions) -> StashResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StashError::Internal(e.to_string()))?;
        data.insert(key.to_owned(), value.encode());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> StashOptions {
        StashOptions::new()
    }

    #[test]
    fn test_memory_get_set() {
        let store = MemoryBackend::new();
        store.set("k", StashValue::from("hello"), &opts()).unwrap();
        assert_eq!(
            store.get("k", &opts()).unwrap(),
            Some(StashValue::from("hello"))
        );
    }

    #[test]
    fn test_memory_get_missing() {
        let store = MemoryBackend::new();
        assert!(store.get("missing", &opts()).unwrap().is_none());
        assert!(store.get_boolean("missing", &opts()).unwrap().is_none());
    }

    #[test]
    fn test_memory_stores_encoded_strings() {
        let store = MemoryBackend::new();
        store.set("flag", StashValue::Bool(false), &opts()).unwrap();
        store.set("count", StashValue::Number(0.0), &opts()).unwrap();

        assert_eq!(
            store.get("flag", &opts()).unwrap(),
            Some(StashValue::from("false"))
        );
        assert_eq!(store.get_boolean("flag", &opts()).unwrap(), Some(false));
        assert_eq!(store.get_number("count", &opts()).unwrap(), Some(0.0));
        assert_eq!(
            store.get_string("count", &opts()).unwrap().as_deref(),
            Some("0")
        );
    }

    #[test]
    fn test_memory_delete() {
        let store = MemoryBackend::new();
        store.set("k", StashValue::from("v"), &opts()).unwrap();
        store.delete("k", &opts()).unwrap();
        store.delete("k", &opts()).unwrap();
        assert!(store.get("k", &opts()).unwrap().is_none());
    }

    #[test]
    fn test_memory_clear_namespace() {
        let store = MemoryBackend::new();
        store.set("a_one", StashValue::from("1"), &opts()).unwrap();
        store.set("a_two", StashValue::from("2"), &opts()).unwrap();
        store.set("b_one", StashValue::from("3"), &opts()).unwrap();
        store.set("plain", StashValue::from("4"), &opts()).unwrap();

        store.clear_all(Some("a"), &opts()).unwrap();
        assert_eq!(store.len().unwrap(), 2);
        assert!(store.get("b_one", &opts()).unwrap().is_some());

        store.clear_all(None, &opts()).unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_memory_async_variants_delegate() {
        let store = MemoryBackend::new();
        store
            .set_async("k", StashValue::Number(2.5), &opts())
            .await
            .unwrap();
        assert_eq!(store.get_number_async("k", &opts()).await.unwrap(), Some(2.5));
        store.delete_async("k", &opts()).await.unwrap();
        assert!(store.get_string_async("k", &opts()).await.unwrap().is_none());
    }
}
