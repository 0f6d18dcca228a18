//! Keystash Storage - the backend contract behind the keystash facade.
//!
//! Every storage medium the facade can route to implements [`Backend`]:
//! a fixed set of synchronous and asynchronous operations over
//! [`StashValue`]s, plus a one-time [`init`](Backend::init) hook. The facade
//! never looks inside an adapter; it only relies on this contract and on the
//! [`Capabilities`] an adapter reports.
//!
//! # Bundled adapters
//!
//! | Adapter | Medium | Notes |
//! |---------|--------|-------|
//! | [`MemoryBackend`] | volatile map | string-only, bulk clear by namespace |
//! | [`FileBackend`] | JSON file on disk | durable, typed, async ops run off-thread |
//! | [`CookieBackend`] | one request's cookie jar | requires a [`RequestContext`] |
//! | [`EnvBackend`] | environment variables | read-only, structured model |
//!
//! # Keys
//!
//! Keys handed to a backend are *physical* keys: the facade has already
//! applied the namespace prefix (see [`namespaced_key`]). Backends that
//! support bulk erase use [`namespace_prefix`] to scope
//! [`clear_all`](Backend::clear_all) to one namespace.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod backend;
pub mod context;
pub mod cookie;
pub mod env;
pub mod error;
pub mod file;
pub mod memory;
pub mod options;
pub mod value;

pub use backend::{
    Backend, Capabilities, InitOptions, NAMESPACE_SEPARATOR, namespace_prefix, namespaced_key,
    require_context, validate_key, validate_namespace,
};
pub use context::RequestContext;
pub use cookie::CookieBackend;
pub use env::{EnvBackend, EnvFormat, EnvItem, EnvModel};
pub use error::{StashError, StashResult};
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use options::{SameSite, Slot, StashOptions};
pub use value::{StashValue, decode_boolean, decode_number};
