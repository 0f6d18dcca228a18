//! Per-call operation options and routing slots.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;

/// One of the three routing destinations a facade can bind a backend to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    /// Native mobile runtime.
    Native,
    /// Server-rendered request handling.
    Ssr,
    /// Web client.
    Web,
}

impl Slot {
    /// All slots, in routing precedence order.
    pub const ALL: [Slot; 3] = [Slot::Native, Slot::Ssr, Slot::Web];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Ssr => "ssr",
            Self::Web => "web",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" => Ok(Self::Native),
            "ssr" => Ok(Self::Ssr),
            "web" => Ok(Self::Web),
            other => Err(format!(
                "unknown backend slot '{other}'; expected one of: native, ssr, web"
            )),
        }
    }
}

/// Cookie `SameSite` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    /// `SameSite=Strict`
    Strict,
    /// `SameSite=Lax`
    Lax,
    /// `SameSite=None`
    None,
}

impl SameSite {
    /// Attribute value as rendered in a `Set-Cookie` header.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Immutable per-call configuration.
///
/// Backends ignore the fields that do not apply to their medium; the cookie
/// attributes, for example, only matter to [`CookieBackend`](crate::CookieBackend).
///
/// # Example
///
/// ```rust
/// use keystash_storage::{Slot, StashOptions};
///
/// let options = StashOptions::new()
///     .with_backend(Slot::Ssr)
///     .with_max_age(3600)
///     .silent();
/// assert_eq!(options.backend, Some(Slot::Ssr));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StashOptions {
    /// Forces routing to this slot, overriding runtime classification.
    pub backend: Option<Slot>,
    /// Correlation object for context-scoped backends.
    pub context: Option<RequestContext>,
    /// Returned by getters when the stored value is absent.
    pub default: Option<serde_json::Value>,
    /// Cookie `Domain` attribute.
    pub domain: Option<String>,
    /// Cookie `Path` attribute (`/` when unset).
    pub path: Option<String>,
    /// Cookie `Max-Age` attribute, in seconds.
    pub max_age: Option<u64>,
    /// Cookie `Secure` attribute.
    pub secure: bool,
    /// Cookie `HttpOnly` attribute.
    pub http_only: bool,
    /// Cookie `SameSite` attribute.
    pub same_site: Option<SameSite>,
    /// Turn context validation failures into no-ops.
    pub silent: bool,
}

impl StashOptions {
    /// Options with every field unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Force routing to `slot`.
    #[must_use]
    pub fn with_backend(mut self, slot: Slot) -> Self {
        self.backend = Some(slot);
        self
    }

    /// Attach a request context.
    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Set the fallback returned for absent values.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<serde_json::Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the cookie `Domain` attribute.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the cookie `Path` attribute.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the cookie `Max-Age` attribute.
    #[must_use]
    pub fn with_max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Mark the cookie `Secure`.
    #[must_use]
    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    /// Mark the cookie `HttpOnly`.
    #[must_use]
    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    /// Set the cookie `SameSite` attribute.
    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Degrade context failures to no-ops instead of errors.
    #[must_use]
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}
