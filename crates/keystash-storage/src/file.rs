//! Durable backend persisted as a JSON file.
//!
//! The whole map lives in one JSON object file, loaded on first use and
//! rewritten atomically (temp file + rename) after every mutation while the
//! write lock is held, so concurrent writers never interleave on disk.
//! Values keep their JSON type: booleans and numbers are stored natively.
//!
//! The async variants move the blocking file I/O onto tokio's blocking pool
//! and therefore need a running tokio runtime.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::backend::{Backend, Capabilities, InitOptions, namespace_prefix};
use crate::error::{StashError, StashResult};
use crate::options::StashOptions;
use crate::value::StashValue;

/// File stem used when no namespace is known.
const DEFAULT_FILE_STEM: &str = "storage";

type Entries = BTreeMap<String, StashValue>;

#[derive(Debug)]
enum Location {
    /// One file per namespace inside this directory, chosen at init.
    Directory(PathBuf),
    /// A fixed file.
    File(PathBuf),
}

#[derive(Debug)]
struct FileStore {
    location: Location,
    path: OnceLock<PathBuf>,
    /// `None` until the file has been read.
    entries: RwLock<Option<Entries>>,
}

/// Durable key-value backend stored in a JSON file.
///
/// # Example
///
/// ```rust,no_run
/// use keystash_storage::{Backend, FileBackend, InitOptions, StashOptions, StashValue};
///
/// # fn main() -> keystash_storage::StashResult<()> {
/// let backend = FileBackend::new("./data");
/// backend.init(&InitOptions::new().with_namespace("myapp"))?; // ./data/myapp.json
/// backend.set("myapp_theme", StashValue::from("dark"), &StashOptions::new())?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileBackend {
    inner: Arc<FileStore>,
}

impl FileBackend {
    /// Store data under `dir`, in `{namespace}.json` (or `storage.json`).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_location(Location::Directory(dir.into()))
    }

    /// Store data in exactly this file, whatever the namespace.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self::with_location(Location::File(path.into()))
    }

    fn with_location(location: Location) -> Self {
        Self {
            inner: Arc::new(FileStore {
                location,
                path: OnceLock::new(),
                entries: RwLock::new(None),
            }),
        }
    }

    /// Path of the backing file.
    ///
    /// Before [`init`](Backend::init) this is the file a namespace-less
    /// backend would use; asking does not fix the choice.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        match self.inner.path.get() {
            Some(path) => path.clone(),
            None => self.inner.location.file_for(None),
        }
    }
}

impl Location {
    fn file_for(&self, namespace: Option<&str>) -> PathBuf {
        match self {
            Self::File(path) => path.clone(),
            Self::Directory(dir) => {
                let stem = namespace.unwrap_or(DEFAULT_FILE_STEM);
                dir.join(format!("{stem}.json"))
            },
        }
    }
}

impl FileStore {
    fn path(&self, namespace: Option<&str>) -> &Path {
        self.path.get_or_init(|| self.location.file_for(namespace))
    }

    fn read<R>(&self, f: impl FnOnce(&Entries) -> R) -> StashResult<R> {
        {
            let entries = self
                .entries
                .read()
                .map_err(|e| StashError::Internal(e.to_string()))?;
            if let Some(entries) = entries.as_ref() {
                return Ok(f(entries));
            }
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StashError::Internal(e.to_string()))?;
        let loaded = self.load_into(&mut *entries)?;
        Ok(f(loaded))
    }

    /// Apply `f` and persist if it reports a change.
    fn mutate(&self, f: impl FnOnce(&mut Entries) -> bool) -> StashResult<()> {
        let mut guard = self
            .entries
            .write()
            .map_err(|e| StashError::Internal(e.to_string()))?;
        let entries = self.load_into(&mut *guard)?;
        if f(&mut *entries) {
            self.persist(entries)?;
        }
        Ok(())
    }

    fn load_into<'a>(&self, slot: &'a mut Option<Entries>) -> StashResult<&'a mut Entries> {
        if slot.is_none() {
            *slot = Some(self.load()?);
        }
        slot.as_mut()
            .ok_or_else(|| StashError::Internal("file backend entries not loaded".into()))
    }

    fn load(&self) -> StashResult<Entries> {
        let path = self.path(None);
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "storage file not found, starting empty");
                return Ok(Entries::new());
            },
            Err(e) => {
                return Err(StashError::Io(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            },
        };
        if content.trim().is_empty() {
            return Ok(Entries::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            StashError::Internal(format!("corrupt storage file {}: {e}", path.display()))
        })
    }

    fn persist(&self, entries: &Entries) -> StashResult<()> {
        let path = self.path(None);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StashError::Io(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| StashError::Encode(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| StashError::Io(format!("failed to write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, path)
            .map_err(|e| StashError::Io(format!("failed to replace {}: {e}", path.display())))
    }

    fn get(&self, key: &str) -> StashResult<Option<StashValue>> {
        self.read(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: StashValue) -> StashResult<()> {
        self.mutate(|entries| {
            entries.insert(key.to_owned(), value);
            true
        })
    }

    fn delete(&self, key: &str) -> StashResult<()> {
        self.mutate(|entries| entries.remove(key).is_some())
    }

    fn clear(&self, namespace: Option<&str>) -> StashResult<()> {
        self.mutate(|entries| {
            let before = entries.len();
            match namespace {
                Some(ns) => {
                    let prefix = namespace_prefix(ns);
                    entries.retain(|k, _| !k.starts_with(&prefix));
                },
                None => entries.clear(),
            }
            entries.len() != before
        })
    }
}

/// Run a blocking file operation on tokio's blocking pool.
async fn blocking<T, F>(operation: &'static str, f: F) -> StashResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> StashResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StashError::Internal(format!("file backend {operation}: {e}")))?
}

#[async_trait]
impl Backend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            bulk_clear: true,
            typed_values: true,
            native_async: true,
            ..Capabilities::default()
        }
    }

    fn init(&self, options: &InitOptions) -> StashResult<()> {
        let path = self.inner.path(options.namespace.as_deref());
        debug!(path = %path.display(), "file backend ready");
        Ok(())
    }

    fn clear_all(&self, namespace: Option<&str>, _options: &StashOptions) -> StashResult<()> {
        self.inner.clear(namespace)
    }

    fn delete(&self, key: &str, _options: &StashOptions) -> StashResult<()> {
        self.inner.delete(key)
    }

    fn get(&self, key: &str, _options: &StashOptions) -> StashResult<Option<StashValue>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: StashValue, _options: &StashOptions) -> StashResult<()> {
        self.inner.set(key, value)
    }

    async fn clear_all_async(
        &self,
        namespace: Option<&str>,
        _options: &StashOptions,
    ) -> StashResult<()> {
        let store = Arc::clone(&self.inner);
        let namespace = namespace.map(str::to_owned);
        blocking("clear_all", move || store.clear(namespace.as_deref())).await
    }

    async fn delete_async(&self, key: &str, _options: &StashOptions) -> StashResult<()> {
        let store = Arc::clone(&self.inner);
        let key = key.to_owned();
        blocking("delete", move || store.delete(&key)).await
    }

    async fn get_async(
        &self,
        key: &str,
        _options: &StashOptions,
    ) -> StashResult<Option<StashValue>> {
        let store = Arc::clone(&self.inner);
        let key = key.to_owned();
        blocking("get", move || store.get(&key)).await
    }

    async fn set_async(
        &self,
        key: &str,
        value: StashValue,
        _options: &StashOptions,
    ) -> StashResult<()> {
        let store = Arc::clone(&self.inner);
        let key = key.to_owned();
        blocking("set", move || store.set(&key, value)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> StashOptions {
        StashOptions::new()
    }

    fn make_backend() -> (FileBackend, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        backend
            .init(&InitOptions::new().with_namespace("app"))
            .unwrap();
        (backend, dir)
    }

    #[test]
    fn test_file_path_follows_namespace() {
        let (backend, dir) = make_backend();
        assert_eq!(backend.path(), dir.path().join("app.json"));

        let fixed = FileBackend::at(dir.path().join("fixed.json"));
        fixed
            .init(&InitOptions::new().with_namespace("ignored"))
            .unwrap();
        assert_eq!(fixed.path(), dir.path().join("fixed.json"));
    }

    #[test]
    fn test_file_path_before_init_does_not_pin() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        assert_eq!(backend.path(), dir.path().join("storage.json"));

        backend
            .init(&InitOptions::new().with_namespace("app"))
            .unwrap();
        assert_eq!(backend.path(), dir.path().join("app.json"));

        backend.set("app_k", StashValue::from("v"), &opts()).unwrap();
        assert!(dir.path().join("app.json").exists());
        assert!(!dir.path().join("storage.json").exists());
    }

    #[test]
    fn test_file_keeps_types() {
        let (backend, _dir) = make_backend();
        backend.set("app_flag", StashValue::Bool(true), &opts()).unwrap();
        backend.set("app_n", StashValue::Number(3.0), &opts()).unwrap();

        assert_eq!(
            backend.get("app_flag", &opts()).unwrap(),
            Some(StashValue::Bool(true))
        );
        assert_eq!(backend.get_number("app_n", &opts()).unwrap(), Some(3.0));
        assert_eq!(
            backend.get_string("app_n", &opts()).unwrap().as_deref(),
            Some("3")
        );
    }

    #[test]
    fn test_file_survives_reopen() {
        let (backend, dir) = make_backend();
        backend
            .set("app_theme", StashValue::from("dark"), &opts())
            .unwrap();

        let reopened = FileBackend::new(dir.path());
        reopened
            .init(&InitOptions::new().with_namespace("app"))
            .unwrap();
        assert_eq!(
            reopened.get_string("app_theme", &opts()).unwrap().as_deref(),
            Some("dark")
        );
    }

    #[test]
    fn test_file_delete_and_clear() {
        let (backend, _dir) = make_backend();
        backend.set("app_a", StashValue::from("1"), &opts()).unwrap();
        backend.set("app_b", StashValue::from("2"), &opts()).unwrap();
        backend.set("other_c", StashValue::from("3"), &opts()).unwrap();

        backend.delete("app_a", &opts()).unwrap();
        assert!(backend.get("app_a", &opts()).unwrap().is_none());

        backend.clear_all(Some("app"), &opts()).unwrap();
        assert!(backend.get("app_b", &opts()).unwrap().is_none());
        assert!(backend.get("other_c", &opts()).unwrap().is_some());
    }

    #[test]
    fn test_file_corrupt_contents_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();

        let backend = FileBackend::at(&path);
        assert!(matches!(
            backend.get("k", &opts()),
            Err(StashError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_file_async_round_trip() {
        let (backend, _dir) = make_backend();
        backend
            .set_async("app_k", StashValue::from("v"), &opts())
            .await
            .unwrap();
        assert_eq!(
            backend.get_string_async("app_k", &opts()).await.unwrap(),
            Some("v".to_owned())
        );
        backend.clear_all_async(None, &opts()).await.unwrap();
        assert!(backend.get_async("app_k", &opts()).await.unwrap().is_none());
    }
}
