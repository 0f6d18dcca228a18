//! The backend contract every storage adapter implements.
//!
//! The [`Backend`] trait has seven required operations and derives the rest:
//! typed getters decode the raw [`StashValue`] through the shared helpers in
//! [`crate::value`], and every async variant defaults to its synchronous
//! form. Adapters whose medium is genuinely asynchronous override the async
//! variants.

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::{StashError, StashResult};
use crate::options::StashOptions;
use crate::value::{StashValue, decode_boolean, decode_number};

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Separator between a namespace identifier and a logical key.
pub const NAMESPACE_SEPARATOR: char = '_';

/// Validate that a namespace identifier is safe to use as a key prefix.
///
/// Identifiers must be non-empty and must not contain the separator or the
/// null byte. Since no identifier contains the separator, the first
/// separator in a physical key always ends the namespace, so two different
/// identifiers never produce the same physical key.
///
/// # Errors
///
/// Returns [`StashError::InvalidNamespace`] if the identifier is rejected.
pub fn validate_namespace(namespace: &str) -> StashResult<()> {
    if namespace.is_empty() {
        return Err(StashError::InvalidNamespace(
            "namespace must not be empty".into(),
        ));
    }
    if namespace.contains(NAMESPACE_SEPARATOR) {
        return Err(StashError::InvalidNamespace(format!(
            "namespace '{namespace}' must not contain '{NAMESPACE_SEPARATOR}'"
        )));
    }
    if namespace.contains('\0') {
        return Err(StashError::InvalidNamespace(
            "namespace must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Validate that a logical key is safe for storage.
///
/// # Errors
///
/// Returns [`StashError::InvalidKey`] if the key is empty or contains a null byte.
pub fn validate_key(key: &str) -> StashResult<()> {
    if key.is_empty() {
        return Err(StashError::InvalidKey("key must not be empty".into()));
    }
    if key.contains('\0') {
        return Err(StashError::InvalidKey(
            "key must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Build the physical key `"{namespace}_{key}"`, or `key` without a namespace.
#[must_use]
pub fn namespaced_key(namespace: Option<&str>, key: &str) -> String {
    match namespace {
        Some(ns) => format!("{ns}{NAMESPACE_SEPARATOR}{key}"),
        None => key.to_owned(),
    }
}

/// The prefix shared by every physical key in `namespace`.
#[must_use]
pub fn namespace_prefix(namespace: &str) -> String {
    format!("{namespace}{NAMESPACE_SEPARATOR}")
}

/// Resolve the request context for a context-scoped operation.
///
/// Returns `Ok(None)` when the context is missing but the call is `silent`,
/// in which case the caller degrades to a no-op.
///
/// # Errors
///
/// Returns [`StashError::MissingContext`] when the context is missing and
/// the call is not silent.
pub fn require_context<'a>(
    backend: &'static str,
    operation: &'static str,
    options: &'a StashOptions,
) -> StashResult<Option<&'a RequestContext>> {
    match (&options.context, options.silent) {
        (Some(context), _) => Ok(Some(context)),
        (None, true) => {
            tracing::trace!(backend, operation, "no request context, silent no-op");
            Ok(None)
        },
        (None, false) => Err(StashError::MissingContext { backend, operation }),
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What an adapter's medium can and cannot do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// Calls need a [`RequestContext`] in their options.
    pub requires_context: bool,
    /// Every mutation fails with [`StashError::UnsupportedOperation`].
    pub read_only: bool,
    /// [`Backend::clear_all`] is supported.
    pub bulk_clear: bool,
    /// Booleans and numbers are stored natively rather than as strings.
    pub typed_values: bool,
    /// The async variants perform real asynchronous work.
    pub native_async: bool,
}

/// Options passed to [`Backend::init`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitOptions {
    /// Namespace identifier of the facade binding this adapter.
    pub namespace: Option<String>,
}

impl InitOptions {
    /// Init options without a namespace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace identifier.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Storage adapter contract.
///
/// Reads return `None` when the key is absent so the facade can tell
/// "absent" apart from a falsy stored value. Values handed to
/// [`set`](Self::set) are already encoded by the facade.
///
/// Adapters are shared by every call on a facade and may be called
/// concurrently; any interior mutable state is the adapter's to guard.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short adapter name used in errors and logs.
    fn name(&self) -> &'static str;

    /// What this adapter's medium supports.
    fn capabilities(&self) -> Capabilities;

    /// One-time setup. Must tolerate being called again.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be prepared.
    fn init(&self, options: &InitOptions) -> StashResult<()>;

    /// Erase every key in `namespace` (every key at all when `None`).
    ///
    /// # Errors
    ///
    /// May return [`StashError::UnsupportedOperation`] for media without a
    /// bulk-erase concept.
    fn clear_all(&self, namespace: Option<&str>, options: &StashOptions) -> StashResult<()>;

    /// Remove a key. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium rejects the call.
    fn delete(&self, key: &str, options: &StashOptions) -> StashResult<()>;

    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium rejects the call.
    fn get(&self, key: &str, options: &StashOptions) -> StashResult<Option<StashValue>>;

    /// Store `value` under `key`, overwriting any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium rejects the call.
    fn set(&self, key: &str, value: StashValue, options: &StashOptions) -> StashResult<()>;

    /// Read a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::Decode`] if the stored value is not a boolean.
    fn get_boolean(&self, key: &str, options: &StashOptions) -> StashResult<Option<bool>> {
        self.get(key, options)?
            .map(|value| decode_boolean(key, &value))
            .transpose()
    }

    /// Read a number.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::Decode`] if the stored value is not a number.
    fn get_number(&self, key: &str, options: &StashOptions) -> StashResult<Option<f64>> {
        self.get(key, options)?
            .map(|value| decode_number(key, &value))
            .transpose()
    }

    /// Read the string form of the stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium rejects the call.
    fn get_string(&self, key: &str, options: &StashOptions) -> StashResult<Option<String>> {
        Ok(self.get(key, options)?.map(|value| value.encode()))
    }

    // -- Async variants --

    /// Async form of [`clear_all`](Self::clear_all).
    async fn clear_all_async(
        &self,
        namespace: Option<&str>,
        options: &StashOptions,
    ) -> StashResult<()> {
        self.clear_all(namespace, options)
    }

    /// Async form of [`delete`](Self::delete).
    async fn delete_async(&self, key: &str, options: &StashOptions) -> StashResult<()> {
        self.delete(key, options)
    }

    /// Async form of [`get`](Self::get).
    async fn get_async(&self, key: &str, options: &StashOptions) -> StashResult<Option<StashValue>> {
        self.get(key, options)
    }

    /// Async form of [`get_boolean`](Self::get_boolean).
    async fn get_boolean_async(
        &self,
        key: &str,
        options: &StashOptions,
    ) -> StashResult<Option<bool>> {
        self.get_async(key, options)
            .await?
            .map(|value| decode_boolean(key, &value))
            .transpose()
    }

    /// Async form of [`get_number`](Self::get_number).
    async fn get_number_async(
        &self,
        key: &str,
        options: &StashOptions,
    ) -> StashResult<Option<f64>> {
        self.get_async(key, options)
            .await?
            .map(|value| decode_number(key, &value))
            .transpose()
    }

    /// Async form of [`get_string`](Self::get_string).
    async fn get_string_async(
        &self,
        key: &str,
        options: &StashOptions,
    ) -> StashResult<Option<String>> {
        Ok(self
            .get_async(key, options)
            .await?
            .map(|value| value.encode()))
    }

    /// Async form of [`set`](Self::set).
    async fn set_async(
        &self,
        key: &str,
        value: StashValue,
        options: &StashOptions,
    ) -> StashResult<()> {
        self.set(key, value, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_namespace_rejects_empty() {
        assert!(validate_namespace("").is_err());
    }

    #[test]
    fn test_validate_namespace_rejects_separator() {
        assert!(matches!(
            validate_namespace("my_app"),
            Err(StashError::InvalidNamespace(_))
        ));
        assert!(validate_namespace("myapp").is_ok());
        assert!(validate_namespace("my-app.v2").is_ok());
    }

    #[test]
    fn test_validate_namespace_rejects_null_byte() {
        assert!(validate_namespace("ns\0bad").is_err());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("").is_err());
        assert!(validate_key("k\0bad").is_err());
        assert!(validate_key("user_settings").is_ok());
    }

    #[test]
    fn test_namespaced_key() {
        assert_eq!(namespaced_key(Some("app"), "theme"), "app_theme");
        assert_eq!(namespaced_key(None, "theme"), "theme");
        assert_eq!(namespace_prefix("app"), "app_");
    }

    #[test]
    fn test_distinct_namespaces_never_collide() {
        // "a" + "b_c" and "ab" + "c" would collide only if ids could hold the separator.
        let first = namespaced_key(Some("a"), "b_c");
        let second = namespaced_key(Some("ab"), "c");
        assert_ne!(first, second);
        assert!(validate_namespace("a_b").is_err());
    }

    #[test]
    fn test_require_context() {
        let options = StashOptions::new();
        assert!(matches!(
            require_context("cookie", "get", &options),
            Err(StashError::MissingContext {
                backend: "cookie",
                operation: "get"
            })
        ));

        let silent = StashOptions::new().silent();
        assert!(require_context("cookie", "get", &silent).unwrap().is_none());

        let with_context = StashOptions::new().with_context(RequestContext::new());
        assert!(
            require_context("cookie", "get", &with_context)
                .unwrap()
                .is_some()
        );
    }
}
