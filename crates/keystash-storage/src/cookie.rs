//! Cookie backend for server-side request handling.
//!
//! Cookies live in one request, not in the process, so every call must
//! carry the request's [`RequestContext`] in its options. Without one the
//! call fails with [`StashError::MissingContext`], or does nothing when the
//! options are `silent`.

use crate::backend::{Backend, Capabilities, InitOptions, require_context};
use crate::error::{StashError, StashResult};
use crate::options::StashOptions;
use crate::value::StashValue;

/// Context-scoped backend over a request's cookie jar.
///
/// # Example
///
/// ```rust
/// use keystash_storage::{Backend, CookieBackend, RequestContext, StashOptions, StashValue};
///
/// # fn main() -> keystash_storage::StashResult<()> {
/// let ctx = RequestContext::from_cookie_header("app_theme=dark");
/// let options = StashOptions::new().with_context(ctx.clone());
///
/// let backend = CookieBackend::new();
/// assert_eq!(backend.get_string("app_theme", &options)?.as_deref(), Some("dark"));
///
/// backend.set("app_theme", StashValue::from("light"), &options)?;
/// assert_eq!(ctx.set_cookie_headers(), vec!["app_theme=light; Path=/"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct CookieBackend;

impl CookieBackend {
    /// Create a cookie backend.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Backend for CookieBackend {
    fn name(&self) -> &'static str {
        "cookie"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            requires_context: true,
            ..Capabilities::default()
        }
    }

    fn init(&self, _options: &InitOptions) -> StashResult<()> {
        Ok(())
    }

    fn clear_all(&self, _namespace: Option<&str>, _options: &StashOptions) -> StashResult<()> {
        Err(StashError::UnsupportedOperation {
            backend: self.name(),
            operation: "clear_all",
        })
    }

    fn delete(&self, key: &str, options: &StashOptions) -> StashResult<()> {
        match require_context(self.name(), "delete", options)? {
            Some(ctx) => ctx.remove_cookie(key, options),
            None => Ok(()),
        }
    }

    fn get(&self, key: &str, options: &StashOptions) -> StashResult<Option<StashValue>> {
        let Some(ctx) = require_context(self.name(), "get", options)? else {
            return Ok(None);
        };
        Ok(ctx.cookie(key).map(StashValue::String))
    }

    fn set(&self, key: &str, value: StashValue, options: &StashOptions) -> StashResult<()> {
        match require_context(self.name(), "set", options)? {
            Some(ctx) => ctx.write_cookie(key, &value.encode(), options),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;

    #[test]
    fn test_cookie_requires_context() {
        let backend = CookieBackend::new();
        let err = backend.get("k", &StashOptions::new()).unwrap_err();
        assert!(matches!(
            err,
            StashError::MissingContext {
                backend: "cookie",
                operation: "get"
            }
        ));
        assert!(matches!(
            backend.set("k", StashValue::from("v"), &StashOptions::new()),
            Err(StashError::MissingContext { .. })
        ));
        assert!(matches!(
            backend.delete("k", &StashOptions::new()),
            Err(StashError::MissingContext { .. })
        ));
    }

    #[test]
    fn test_cookie_silent_without_context() {
        let backend = CookieBackend::new();
        let silent = StashOptions::new().silent();
        assert!(backend.get("k", &silent).unwrap().is_none());
        assert!(backend.get_boolean("k", &silent).unwrap().is_none());
        backend.set("k", StashValue::Bool(true), &silent).unwrap();
        backend.delete("k", &silent).unwrap();
    }

    #[test]
    fn test_cookie_round_trip_within_request() {
        let backend = CookieBackend::new();
        let ctx = RequestContext::new();
        let options = StashOptions::new().with_context(ctx.clone());

        backend.set("flag", StashValue::Bool(true), &options).unwrap();
        backend.set("n", StashValue::Number(42.0), &options).unwrap();

        assert_eq!(backend.get_boolean("flag", &options).unwrap(), Some(true));
        assert_eq!(backend.get_number("n", &options).unwrap(), Some(42.0));

        backend.delete("flag", &options).unwrap();
        assert!(backend.get("flag", &options).unwrap().is_none());
        assert_eq!(ctx.set_cookie_headers().len(), 3);
    }

    #[test]
    fn test_cookie_clear_all_unsupported_even_when_silent() {
        let backend = CookieBackend::new();
        let options = StashOptions::new()
            .with_context(RequestContext::new())
            .silent();
        assert!(matches!(
            backend.clear_all(None, &options),
            Err(StashError::UnsupportedOperation {
                operation: "clear_all",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_cookie_async_variants() {
        let backend = CookieBackend::new();
        let options = StashOptions::new().with_context(RequestContext::new());
        backend
            .set_async("k", StashValue::from("v"), &options)
            .await
            .unwrap();
        assert_eq!(
            backend.get_string_async("k", &options).await.unwrap(),
            Some("v".to_owned())
        );
        assert!(matches!(
            backend.get_async("k", &StashOptions::new()).await,
            Err(StashError::MissingContext { .. })
        ));
    }
}
