//! Keystash - one key/value API for native, server-rendered and web code.
//!
//! A [`Stash`] holds up to three storage backends, one per [`Slot`], and
//! routes every call to one of them: the slot forced by the call's
//! [`StashOptions`], or the slot matching the [`Runtime`] its
//! [`RuntimeClassifier`] reports. Values are encoded once in the facade, so
//! call sites read and write booleans, numbers, strings and any
//! `serde` type without knowing which medium is underneath.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use keystash::{CookieBackend, MemoryBackend, RequestContext, Slot, Stash, StashOptions};
//!
//! # fn main() -> keystash::StashResult<()> {
//! let stash = Stash::builder()
//!     .id("app")
//!     .ssr(Arc::new(CookieBackend::new()))
//!     .web(Arc::new(MemoryBackend::new()))
//!     .build()?;
//!
//! let ctx = RequestContext::new();
//! let options = StashOptions::new()
//!     .with_backend(Slot::Ssr)
//!     .with_context(ctx.clone());
//! stash.set("visited", &true, &options)?;
//! assert_eq!(stash.get_boolean("visited", &options)?, Some(true));
//! assert_eq!(ctx.set_cookie_headers(), vec!["app_visited=true; Path=/"]);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod builder;
mod codec;
mod defaults;
mod item;
mod logger;
mod runtime;
mod stash;

pub use builder::StashBuilder;
pub use defaults::{default_data_dir, platform_default};
pub use item::StashItem;
pub use logger::{LogLevel, LogRecord, Logger, TracingLogger};
pub use runtime::{FixedClassifier, PlatformClassifier, Runtime, RuntimeClassifier};
pub use stash::Stash;

pub use keystash_storage::{
    Backend, Capabilities, CookieBackend, EnvBackend, EnvFormat, EnvItem, EnvModel, FileBackend,
    InitOptions, MemoryBackend, RequestContext, SameSite, Slot, StashError, StashOptions,
    StashResult, StashValue,
};
