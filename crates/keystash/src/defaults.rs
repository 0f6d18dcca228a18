//! Platform default adapters.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use keystash_storage::{Backend, CookieBackend, FileBackend, MemoryBackend, Slot};

/// The platform data directory for keystash, if the platform has one.
///
/// - Linux: `~/.local/share/keystash`
/// - macOS: `~/Library/Application Support/keystash`
/// - Windows: `%APPDATA%\keystash\data`
#[must_use]
pub fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "keystash").map(|dirs| dirs.data_dir().to_path_buf())
}

/// The adapter bound to `slot` when nothing else was configured.
///
/// Native runtimes get a durable [`FileBackend`] under `data_dir`, servers
/// get the request-scoped [`CookieBackend`], and web clients get a
/// [`MemoryBackend`].
#[must_use]
pub fn platform_default(slot: Slot, data_dir: &Path) -> Arc<dyn Backend> {
    match slot {
        Slot::Native => Arc::new(FileBackend::new(data_dir)),
        Slot::Ssr => Arc::new(CookieBackend::new()),
        Slot::Web => Arc::new(MemoryBackend::new()),
    }
}
