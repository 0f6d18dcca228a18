//! Request context: the correlation object for context-scoped backends.
//!
//! A [`RequestContext`] stands for one incoming request. It carries the
//! request's cookies and collects the `Set-Cookie` headers produced while
//! handling it. Clones share the same jar, so a host can keep one clone to
//! read the response headers while call sites pass others into
//! [`StashOptions`](crate::StashOptions).

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use uuid::Uuid;

use crate::error::{StashError, StashResult};
use crate::options::StashOptions;

/// Characters left unescaped in cookie values, matching `encodeURIComponent`.
const COOKIE_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Characters that may not appear in a cookie name (RFC 6265 token).
const COOKIE_NAME_FORBIDDEN: &[char] = &[
    '(', ')', '<', '>', '@', ',', ';', ':', '\\', '"', '/', '[', ']', '?', '=', '{', '}', ' ',
    '\t',
];

#[derive(Debug, Default)]
struct CookieJar {
    /// Current view: incoming cookies overlaid with this request's writes.
    cookies: BTreeMap<String, String>,
    /// Rendered `Set-Cookie` headers, in write order.
    set_cookies: Vec<String>,
}

#[derive(Debug)]
struct ContextInner {
    request_id: Uuid,
    jar: Mutex<CookieJar>,
}

/// Handle to one request's cookie jar.
///
/// # Example
///
/// ```rust
/// use keystash_storage::RequestContext;
///
/// let ctx = RequestContext::from_cookie_header("theme=dark; lang=en");
/// assert_eq!(ctx.cookie("theme").as_deref(), Some("dark"));
/// assert!(ctx.set_cookie_headers().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// A context for a request that carried no cookies.
    #[must_use]
    pub fn new() -> Self {
        Self::with_jar(CookieJar::default())
    }

    /// A context for a request with the given `Cookie` header value.
    ///
    /// Malformed pairs are skipped; values are percent-decoded.
    #[must_use]
    pub fn from_cookie_header(header: &str) -> Self {
        let cookies = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                let value = value.trim().trim_matches('"');
                Some((name.to_owned(), decode_value(value)))
            })
            .collect();
        Self::with_jar(CookieJar {
            cookies,
            set_cookies: Vec::new(),
        })
    }

    fn with_jar(jar: CookieJar) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                request_id: Uuid::new_v4(),
                jar: Mutex::new(jar),
            }),
        }
    }

    /// Add an incoming cookie.
    #[must_use]
    pub fn with_cookie(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Ok(mut jar) = self.inner.jar.lock() {
            jar.cookies.insert(name.into(), value.into());
        }
        self
    }

    /// Unique identifier of this request.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.inner.request_id
    }

    /// Current value of a cookie, including writes made during this request.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.inner
            .jar
            .lock()
            .ok()
            .and_then(|jar| jar.cookies.get(name).cloned())
    }

    /// Snapshot of every visible cookie.
    #[must_use]
    pub fn cookies(&self) -> BTreeMap<String, String> {
        self.inner
            .jar
            .lock()
            .map(|jar| jar.cookies.clone())
            .unwrap_or_default()
    }

    /// `Set-Cookie` header values produced so far, in write order.
    #[must_use]
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.inner
            .jar
            .lock()
            .map(|jar| jar.set_cookies.clone())
            .unwrap_or_default()
    }

    /// Set a cookie for the response and make it visible to later reads.
    pub(crate) fn write_cookie(
        &self,
        name: &str,
        value: &str,
        options: &StashOptions,
    ) -> StashResult<()> {
        validate_cookie_name(name)?;
        let header = render_set_cookie(name, value, options, options.max_age)?;
        let mut jar = self.lock()?;
        jar.cookies.insert(name.to_owned(), value.to_owned());
        jar.set_cookies.push(header);
        Ok(())
    }

    /// Expire a cookie on the response and hide it from later reads.
    pub(crate) fn remove_cookie(&self, name: &str, options: &StashOptions) -> StashResult<()> {
        validate_cookie_name(name)?;
        let header = render_set_cookie(name, "", options, Some(0))?;
        let mut jar = self.lock()?;
        jar.cookies.remove(name);
        jar.set_cookies.push(header);
        Ok(())
    }

    fn lock(&self) -> StashResult<std::sync::MutexGuard<'_, CookieJar>> {
        self.inner
            .jar
            .lock()
            .map_err(|e| StashError::Internal(e.to_string()))
    }
}

fn decode_value(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn validate_cookie_name(name: &str) -> StashResult<()> {
    if name.is_empty()
        || name
            .chars()
            .any(|c| c.is_control() || COOKIE_NAME_FORBIDDEN.contains(&c))
    {
        return Err(StashError::InvalidKey(format!(
            "'{name}' is not a valid cookie name"
        )));
    }
    Ok(())
}

/// `Path` and `Domain` are written verbatim, so they may not end the
/// attribute early.
fn validate_cookie_attribute(attribute: &str, value: &str) -> StashResult<()> {
    if value.chars().any(|c| c.is_control() || c == ';' || c == ',') {
        return Err(StashError::Encode(format!(
            "cookie {attribute} {value:?} may not contain ';', ',' or control characters"
        )));
    }
    Ok(())
}

fn render_set_cookie(
    name: &str,
    value: &str,
    options: &StashOptions,
    max_age: Option<u64>,
) -> StashResult<String> {
    let path = options.path.as_deref().unwrap_or("/");
    validate_cookie_attribute("Path", path)?;
    if let Some(domain) = &options.domain {
        validate_cookie_attribute("Domain", domain)?;
    }

    let mut header = format!("{name}={}", utf8_percent_encode(value, COOKIE_VALUE));
    let _ = write!(header, "; Path={path}");
    if let Some(domain) = &options.domain {
        let _ = write!(header, "; Domain={domain}");
    }
    if let Some(seconds) = max_age {
        let _ = write!(header, "; Max-Age={seconds}");
    }
    if options.secure {
        header.push_str("; Secure");
    }
    if options.http_only {
        header.push_str("; HttpOnly");
    }
    if let Some(same_site) = options.same_site {
        let _ = write!(header, "; SameSite={}", same_site.as_str());
    }
    Ok(header)
}
