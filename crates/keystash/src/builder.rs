//! Facade construction.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use keystash_storage::{Backend, InitOptions, Slot, StashResult, validate_namespace};
use tracing::debug;

use crate::defaults::platform_default;
use crate::logger::Logger;
use crate::runtime::{PlatformClassifier, RuntimeClassifier};
use crate::stash::Stash;

/// Builder for [`Stash`].
///
/// Slots are bound once here and never change afterwards. [`build`]
/// initializes every distinct bound adapter exactly once, in slot order.
///
/// [`build`]: StashBuilder::build
#[derive(Default)]
#[must_use]
pub struct StashBuilder {
    id: Option<String>,
    slots: [Option<Arc<dyn Backend>>; 3],
    classifier: Option<Arc<dyn RuntimeClassifier>>,
    logger: Option<Arc<dyn Logger>>,
    platform_defaults: Option<PathBuf>,
}

impl fmt::Debug for StashBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StashBuilder")
            .field("id", &self.id)
            .field("platform_defaults", &self.platform_defaults)
            .finish_non_exhaustive()
    }
}

const fn index(slot: Slot) -> usize {
    match slot {
        Slot::Native => 0,
        Slot::Ssr => 1,
        Slot::Web => 2,
    }
}

impl StashBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespace identifier prefixed to every key.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Bind one adapter to every slot.
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.slots = [
            Some(Arc::clone(&backend)),
            Some(Arc::clone(&backend)),
            Some(backend),
        ];
        self
    }

    /// Bind an adapter to one slot.
    pub fn slot(mut self, slot: Slot, backend: Arc<dyn Backend>) -> Self {
        if let Some(entry) = self.slots.get_mut(index(slot)) {
            *entry = Some(backend);
        }
        self
    }

    /// Bind the native slot.
    pub fn native(self, backend: Arc<dyn Backend>) -> Self {
        self.slot(Slot::Native, backend)
    }

    /// Bind the server-side slot.
    pub fn ssr(self, backend: Arc<dyn Backend>) -> Self {
        self.slot(Slot::Ssr, backend)
    }

    /// Bind the web slot.
    pub fn web(self, backend: Arc<dyn Backend>) -> Self {
        self.slot(Slot::Web, backend)
    }

    /// Replace the [`PlatformClassifier`].
    pub fn classifier(mut self, classifier: impl RuntimeClassifier + 'static) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Report operations to `logger`.
    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Bind the platform default adapter to the current runtime's slot if
    /// it is still unbound. File-backed defaults live under `data_dir`.
    pub fn with_platform_defaults(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.platform_defaults = Some(data_dir.into());
        self
    }

    /// Validate, fill defaults and initialize the adapters.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::InvalidNamespace`](keystash_storage::StashError::InvalidNamespace)
    /// for a bad identifier, or the first error an adapter's `init` reports.
    pub fn build(self) -> StashResult<Stash> {
        let Self {
            id,
            mut slots,
            classifier,
            logger,
            platform_defaults,
        } = self;

        if let Some(id) = &id {
            validate_namespace(id)?;
        }
        let classifier: Arc<dyn RuntimeClassifier> =
            classifier.unwrap_or_else(|| Arc::new(PlatformClassifier));

        if let Some(data_dir) = platform_defaults {
            let slot = classifier.classify().slot();
            if let Some(entry @ None) = slots.get_mut(index(slot)) {
                debug!(%slot, data_dir = %data_dir.display(), "binding platform default backend");
                *entry = Some(platform_default(slot, &data_dir));
            }
        }

        let init = match &id {
            Some(id) => InitOptions::new().with_namespace(id.clone()),
            None => InitOptions::new(),
        };
        let mut initialized: Vec<&Arc<dyn Backend>> = Vec::with_capacity(slots.len());
        for backend in slots.iter().flatten() {
            if initialized.iter().any(|seen| Arc::ptr_eq(seen, backend)) {
                continue;
            }
            debug!(backend = backend.name(), "initializing backend");
            backend.init(&init)?;
            initialized.push(backend);
        }

        Ok(Stash::from_parts(id, slots, classifier, logger))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use keystash_storage::{Capabilities, MemoryBackend, StashError, StashOptions, StashValue};

    use super::*;
    use crate::runtime::{FixedClassifier, Runtime};

    #[derive(Default)]
    struct CountingBackend {
        inits: AtomicUsize,
        namespace: std::sync::Mutex<Option<String>>,
    }

    impl Backend for CountingBackend {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::default()
        }

        fn init(&self, options: &InitOptions) -> StashResult<()> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            *self.namespace.lock().unwrap() = options.namespace.clone();
            Ok(())
        }

        fn clear_all(&self, _: Option<&str>, _: &StashOptions) -> StashResult<()> {
            Ok(())
        }

        fn delete(&self, _: &str, _: &StashOptions) -> StashResult<()> {
            Ok(())
        }

        fn get(&self, _: &str, _: &StashOptions) -> StashResult<Option<StashValue>> {
            Ok(None)
        }

        fn set(&self, _: &str, _: StashValue, _: &StashOptions) -> StashResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_shared_adapter_initialized_once() {
        let backend = Arc::new(CountingBackend::default());
        let _stash = StashBuilder::new()
            .id("app")
            .backend(backend.clone())
            .build()
            .unwrap();
        assert_eq!(backend.inits.load(Ordering::SeqCst), 1);
        assert_eq!(backend.namespace.lock().unwrap().as_deref(), Some("app"));
    }

    #[test]
    fn test_distinct_adapters_each_initialized() {
        let native = Arc::new(CountingBackend::default());
        let web = Arc::new(CountingBackend::default());
        let _stash = StashBuilder::new()
            .native(native.clone())
            .ssr(web.clone())
            .web(web.clone())
            .build()
            .unwrap();
        assert_eq!(native.inits.load(Ordering::SeqCst), 1);
        assert_eq!(web.inits.load(Ordering::SeqCst), 1);
        assert!(native.namespace.lock().unwrap().is_none());
    }

    #[test]
    fn test_invalid_id_rejected() {
        for id in ["", "my_app", "nul\0"] {
            assert!(matches!(
                StashBuilder::new().id(id).build(),
                Err(StashError::InvalidNamespace(_))
            ));
        }
    }

    #[test]
    fn test_platform_default_fills_current_slot_only() {
        let dir = tempfile::tempdir().unwrap();
        let stash = StashBuilder::new()
            .classifier(FixedClassifier(Runtime::Web))
            .with_platform_defaults(dir.path())
            .build()
            .unwrap();
        assert_eq!(stash.backend(Slot::Web).map(|b| b.name()), Some("memory"));
        assert!(stash.backend(Slot::Native).is_none());
        assert!(stash.backend(Slot::Ssr).is_none());
    }

    #[test]
    fn test_platform_default_keeps_explicit_binding() {
        let dir = tempfile::tempdir().unwrap();
        let stash = StashBuilder::new()
            .classifier(FixedClassifier(Runtime::Native))
            .native(Arc::new(MemoryBackend::new()))
            .with_platform_defaults(dir.path())
            .build()
            .unwrap();
        assert_eq!(
            stash.backend(Slot::Native).map(|b| b.name()),
            Some("memory")
        );
    }
}
