//! Typed handles bound to a single key.

use std::fmt;

use keystash_storage::{StashOptions, StashResult};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::stash::Stash;

/// A handle to one key of a [`Stash`], for state containers and similar
/// consumers that own a single value.
///
/// Every call runs with `silent` set, so a missing request context reads as
/// the initial value and writes become no-ops instead of errors.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use keystash::{MemoryBackend, Stash};
///
/// # fn main() -> keystash::StashResult<()> {
/// let stash = Stash::builder()
///     .backend(Arc::new(MemoryBackend::new()))
///     .build()?;
/// let counter = stash.item("counter", 0_u32);
///
/// assert_eq!(counter.load()?, 0);
/// counter.store(&5)?;
/// assert_eq!(counter.load()?, 5);
/// # Ok(())
/// # }
/// ```
pub struct StashItem<'a, T> {
    stash: &'a Stash,
    key: String,
    initial: T,
    options: StashOptions,
}

impl<T: fmt::Debug> fmt::Debug for StashItem<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StashItem")
            .field("key", &self.key)
            .field("initial", &self.initial)
            .finish_non_exhaustive()
    }
}

impl<'a, T> StashItem<'a, T> {
    pub(crate) fn new(stash: &'a Stash, key: String, initial: T) -> Self {
        Self {
            stash,
            key,
            initial,
            options: StashOptions::new().silent(),
        }
    }

    /// Use `options` for every call. `silent` stays set.
    #[must_use]
    pub fn with_options(mut self, options: StashOptions) -> Self {
        self.options = options.silent();
        self
    }

    /// The logical key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value reported when the key is absent.
    #[must_use]
    pub fn initial(&self) -> &T {
        &self.initial
    }
}

impl<T> StashItem<'_, T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Read the value, or the initial value when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value does not decode as `T` or the
    /// backend fails.
    pub fn load(&self) -> StashResult<T> {
        Ok(self
            .stash
            .get(&self.key, &self.options)?
            .unwrap_or_else(|| self.initial.clone()))
    }

    /// Store a new value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded or the backend fails.
    pub fn store(&self, value: &T) -> StashResult<()> {
        self.stash.set(&self.key, value, &self.options)
    }

    /// Remove the stored value, so later loads see the initial value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn remove(&self) -> StashResult<()> {
        self.stash.delete(&self.key, &self.options)
    }

    /// Async form of [`load`](Self::load).
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub async fn load_async(&self) -> StashResult<T> {
        Ok(self
            .stash
            .get_async(&self.key, &self.options)
            .await?
            .unwrap_or_else(|| self.initial.clone()))
    }

    /// Async form of [`store`](Self::store).
    ///
    /// # Errors
    ///
    /// See [`store`](Self::store).
    pub async fn store_async(&self, value: &T) -> StashResult<()> {
        self.stash.set_async(&self.key, value, &self.options).await
    }

    /// Async form of [`remove`](Self::remove).
    ///
    /// # Errors
    ///
    /// See [`remove`](Self::remove).
    pub async fn remove_async(&self) -> StashResult<()> {
        self.stash.delete_async(&self.key, &self.options).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use keystash_storage::{CookieBackend, MemoryBackend, RequestContext, Slot};

    use super::*;

    #[test]
    fn test_item_round_trip() {
        let stash = Stash::builder()
            .id("app")
            .backend(Arc::new(MemoryBackend::new()))
            .build()
            .unwrap();
        let theme = stash.item("theme", "light".to_owned());
        assert_eq!(theme.key(), "theme");
        assert_eq!(theme.load().unwrap(), "light");

        theme.store(&"dark".to_owned()).unwrap();
        assert_eq!(theme.load().unwrap(), "dark");

        theme.remove().unwrap();
        assert_eq!(theme.load().unwrap(), *theme.initial());
    }

    #[test]
    fn test_item_is_silent_without_context() {
        let stash = Stash::builder()
            .ssr(Arc::new(CookieBackend::new()))
            .build()
            .unwrap();
        let item = stash
            .item("flag", true)
            .with_options(StashOptions::new().with_backend(Slot::Ssr));
        item.store(&false).unwrap();
        assert!(item.load().unwrap());

        let ctx = RequestContext::new();
        let scoped = stash.item("flag", true).with_options(
            StashOptions::new()
                .with_backend(Slot::Ssr)
                .with_context(ctx.clone()),
        );
        scoped.store(&false).unwrap();
        assert!(!scoped.load().unwrap());
        assert_eq!(ctx.cookie("flag").as_deref(), Some("false"));
    }

    #[tokio::test]
    async fn test_item_async() {
        let stash = Stash::builder()
            .backend(Arc::new(MemoryBackend::new()))
            .build()
            .unwrap();
        let list = stash.item("list", Vec::<u8>::new());
        list.store_async(&vec![1, 2]).await.unwrap();
        assert_eq!(list.load_async().await.unwrap(), vec![1, 2]);
        list.remove_async().await.unwrap();
        assert!(list.load_async().await.unwrap().is_empty());
    }
}
