//! The routing facade.

use std::fmt;
use std::sync::Arc;

use keystash_storage::{
    Backend, Slot, StashError, StashOptions, StashResult, StashValue, namespaced_key,
    validate_key,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::builder::StashBuilder;
use crate::codec;
use crate::item::StashItem;
use crate::logger::{LogLevel, LogRecord, Logger};
use crate::runtime::RuntimeClassifier;

/// Where one call was routed.
#[derive(Debug, Clone, Copy)]
struct Route {
    slot: Slot,
    forced: bool,
}

/// Uniform key/value facade over up to three backends.
///
/// Each call is routed to the backend bound to one [`Slot`]: the slot named
/// by [`StashOptions::backend`] if set, otherwise the slot matching the
/// classifier's current [`Runtime`](crate::Runtime). Keys are prefixed with
/// the facade's namespace identifier before they reach the backend.
///
/// Build one with [`Stash::builder`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use keystash::{MemoryBackend, Stash, StashOptions};
///
/// # fn main() -> keystash::StashResult<()> {
/// let stash = Stash::builder()
///     .id("app")
///     .backend(Arc::new(MemoryBackend::new()))
///     .build()?;
///
/// stash.set("theme", "dark", &StashOptions::new())?;
/// let theme: Option<String> = stash.get("theme", &StashOptions::new())?;
/// assert_eq!(theme.as_deref(), Some("dark"));
/// # Ok(())
/// # }
/// ```
pub struct Stash {
    id: Option<String>,
    label: String,
    native: Option<Arc<dyn Backend>>,
    ssr: Option<Arc<dyn Backend>>,
    web: Option<Arc<dyn Backend>>,
    classifier: Arc<dyn RuntimeClassifier>,
    logger: Option<Arc<dyn Logger>>,
}

impl fmt::Debug for Stash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |b: &Option<Arc<dyn Backend>>| b.as_ref().map(|b| b.name());
        f.debug_struct("Stash")
            .field("id", &self.id)
            .field("native", &name(&self.native))
            .field("ssr", &name(&self.ssr))
            .field("web", &name(&self.web))
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

impl Stash {
    /// Start building a facade.
    #[must_use]
    pub fn builder() -> StashBuilder {
        StashBuilder::new()
    }

    pub(crate) fn from_parts(
        id: Option<String>,
        slots: [Option<Arc<dyn Backend>>; 3],
        classifier: Arc<dyn RuntimeClassifier>,
        logger: Option<Arc<dyn Logger>>,
    ) -> Self {
        let label = match &id {
            Some(id) => format!("keystash-{id}"),
            None => "keystash".to_owned(),
        };
        let [native, ssr, web] = slots;
        Self {
            id,
            label,
            native,
            ssr,
            web,
            classifier,
            logger,
        }
    }

    /// Namespace identifier, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Label used in log records: `keystash` or `keystash-{id}`.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The backend bound to `slot`.
    #[must_use]
    pub fn backend(&self, slot: Slot) -> Option<&Arc<dyn Backend>> {
        match slot {
            Slot::Native => self.native.as_ref(),
            Slot::Ssr => self.ssr.as_ref(),
            Slot::Web => self.web.as_ref(),
        }
    }

    /// The slot a call with `options` routes to. Performs no I/O.
    #[must_use]
    pub fn resolve_slot(&self, options: &StashOptions) -> Slot {
        options
            .backend
            .unwrap_or_else(|| self.classifier.classify().slot())
    }

    /// Typed handle bound to one key. See [`StashItem`].
    #[must_use]
    pub fn item<T>(&self, key: impl Into<String>, initial: T) -> StashItem<'_, T> {
        StashItem::new(self, key.into(), initial)
    }

    // -----------------------------------------------------------------------
    // Synchronous operations
    // -----------------------------------------------------------------------

    /// Erase every key in this facade's namespace on the routed backend.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::BackendUnavailable`] if the routed slot is
    /// unbound, or whatever the backend reports (e.g.
    /// [`StashError::UnsupportedOperation`]).
    pub fn clear_all(&self, options: &StashOptions) -> StashResult<()> {
        let (_, backend) = self.route("clear_all", None, options)?;
        backend.clear_all(self.id(), options)
    }

    /// Remove a key.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::BackendUnavailable`] if the routed slot is
    /// unbound, or whatever the backend reports.
    pub fn delete(&self, key: &str, options: &StashOptions) -> StashResult<()> {
        let physical = self.physical_key(key)?;
        let (_, backend) = self.route("delete", Some(key), options)?;
        backend.delete(&physical, options)
    }

    /// Read a value of any deserializable type.
    ///
    /// Falls back to [`StashOptions::default`] when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::Decode`] if the stored value or the default
    /// does not decode as `T`, [`StashError::BackendUnavailable`] if the
    /// routed slot is unbound, or whatever the backend reports.
    pub fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        options: &StashOptions,
    ) -> StashResult<Option<T>> {
        let physical = self.physical_key(key)?;
        let (route, backend) = self.route("get", Some(key), options)?;
        let raw = backend.get(&physical, options)?;
        self.resolved("get", key, route, &raw);
        Self::or_default(key, codec::decode(key, raw)?, options)
    }

    /// Read a boolean.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_boolean(&self, key: &str, options: &StashOptions) -> StashResult<Option<bool>> {
        let physical = self.physical_key(key)?;
        let (route, backend) = self.route("get_boolean", Some(key), options)?;
        let value = backend.get_boolean(&physical, options)?;
        self.resolved("get_boolean", key, route, &value);
        Self::or_default(key, value, options)
    }

    /// Read a number.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_number(&self, key: &str, options: &StashOptions) -> StashResult<Option<f64>> {
        let physical = self.physical_key(key)?;
        let (route, backend) = self.route("get_number", Some(key), options)?;
        let value = backend.get_number(&physical, options)?;
        self.resolved("get_number", key, route, &value);
        Self::or_default(key, value, options)
    }

    /// Read the string form of a value.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_string(&self, key: &str, options: &StashOptions) -> StashResult<Option<String>> {
        let physical = self.physical_key(key)?;
        let (route, backend) = self.route("get_string", Some(key), options)?;
        let value = backend.get_string(&physical, options)?;
        self.resolved("get_string", key, route, &value);
        Self::or_default(key, value, options)
    }

    /// Store a value, overwriting any existing one.
    ///
    /// Booleans, numbers and strings are stored as primitives; anything
    /// else is stored as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::Encode`] if the value serializes to `null`,
    /// [`StashError::BackendUnavailable`] if the routed slot is unbound, or
    /// whatever the backend reports.
    pub fn set<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
        options: &StashOptions,
    ) -> StashResult<()> {
        let physical = self.physical_key(key)?;
        let encoded = codec::encode(value)?;
        let (route, backend) = self.route("set", Some(key), options)?;
        backend.set(&physical, encoded.clone(), options)?;
        self.stored("set", key, route, &encoded);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Asynchronous operations
    // -----------------------------------------------------------------------

    /// Async form of [`clear_all`](Self::clear_all).
    ///
    /// # Errors
    ///
    /// See [`clear_all`](Self::clear_all).
    pub async fn clear_all_async(&self, options: &StashOptions) -> StashResult<()> {
        let (_, backend) = self.route("clear_all_async", None, options)?;
        backend.clear_all_async(self.id(), options).await
    }

    /// Async form of [`delete`](Self::delete).
    ///
    /// # Errors
    ///
    /// See [`delete`](Self::delete).
    pub async fn delete_async(&self, key: &str, options: &StashOptions) -> StashResult<()> {
        let physical = self.physical_key(key)?;
        let (_, backend) = self.route("delete_async", Some(key), options)?;
        backend.delete_async(&physical, options).await
    }

    /// Async form of [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn get_async<T: DeserializeOwned>(
        &self,
        key: &str,
        options: &StashOptions,
    ) -> StashResult<Option<T>> {
        let physical = self.physical_key(key)?;
        let (route, backend) = self.route("get_async", Some(key), options)?;
        let raw = backend.get_async(&physical, options).await?;
        self.resolved("get_async", key, route, &raw);
        Self::or_default(key, codec::decode(key, raw)?, options)
    }

    /// Async form of [`get_boolean`](Self::get_boolean).
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn get_boolean_async(
        &self,
        key: &str,
        options: &StashOptions,
    ) -> StashResult<Option<bool>> {
        let physical = self.physical_key(key)?;
        let (route, backend) = self.route("get_boolean_async", Some(key), options)?;
        let value = backend.get_boolean_async(&physical, options).await?;
        self.resolved("get_boolean_async", key, route, &value);
        Self::or_default(key, value, options)
    }

    /// Async form of [`get_number`](Self::get_number).
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn get_number_async(
        &self,
        key: &str,
        options: &StashOptions,
    ) -> StashResult<Option<f64>> {
        let physical = self.physical_key(key)?;
        let (route, backend) = self.route("get_number_async", Some(key), options)?;
        let value = backend.get_number_async(&physical, options).await?;
        self.resolved("get_number_async", key, route, &value);
        Self::or_default(key, value, options)
    }

    /// Async form of [`get_string`](Self::get_string).
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn get_string_async(
        &self,
        key: &str,
        options: &StashOptions,
    ) -> StashResult<Option<String>> {
        let physical = self.physical_key(key)?;
        let (route, backend) = self.route("get_string_async", Some(key), options)?;
        let value = backend.get_string_async(&physical, options).await?;
        self.resolved("get_string_async", key, route, &value);
        Self::or_default(key, value, options)
    }

    /// Async form of [`set`](Self::set).
    ///
    /// # Errors
    ///
    /// See [`set`](Self::set).
    pub async fn set_async<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
        options: &StashOptions,
    ) -> StashResult<()> {
        let physical = self.physical_key(key)?;
        let encoded = codec::encode(value)?;
        let (route, backend) = self.route("set_async", Some(key), options)?;
        backend.set_async(&physical, encoded.clone(), options).await?;
        self.stored("set_async", key, route, &encoded);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn physical_key(&self, key: &str) -> StashResult<String> {
        validate_key(key)?;
        Ok(namespaced_key(self.id(), key))
    }

    fn route(
        &self,
        operation: &'static str,
        key: Option<&str>,
        options: &StashOptions,
    ) -> StashResult<(Route, &Arc<dyn Backend>)> {
        let route = match options.backend {
            Some(slot) => Route { slot, forced: true },
            None => Route {
                slot: self.classifier.classify().slot(),
                forced: false,
            },
        };
        if route.forced {
            self.emit(LogLevel::Info, operation, key, route, None, "forced backend");
        } else {
            self.emit(LogLevel::Debug, operation, key, route, None, "using backend");
        }
        let backend = self
            .backend(route.slot)
            .ok_or(StashError::BackendUnavailable { slot: route.slot })?;
        Ok((route, backend))
    }

    fn resolved(&self, operation: &'static str, key: &str, route: Route, value: &dyn fmt::Debug) {
        self.emit(
            LogLevel::Info,
            operation,
            Some(key),
            route,
            Some(value),
            "value resolved",
        );
    }

    fn stored(&self, operation: &'static str, key: &str, route: Route, value: &StashValue) {
        self.emit(
            LogLevel::Info,
            operation,
            Some(key),
            route,
            Some(value),
            "value stored",
        );
    }

    fn emit(
        &self,
        level: LogLevel,
        operation: &'static str,
        key: Option<&str>,
        route: Route,
        value: Option<&dyn fmt::Debug>,
        message: &'static str,
    ) {
        if let Some(logger) = &self.logger {
            logger.log(&LogRecord {
                level,
                instance: &self.label,
                operation,
                key,
                slot: route.slot,
                forced: route.forced,
                value,
                message,
            });
        }
    }

    fn or_default<T: DeserializeOwned>(
        key: &str,
        value: Option<T>,
        options: &StashOptions,
    ) -> StashResult<Option<T>> {
        match value {
            Some(value) => Ok(Some(value)),
            None => codec::default_value(key, options.default.as_ref()),
        }
    }
}
