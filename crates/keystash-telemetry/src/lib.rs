//! Keystash Telemetry - logging setup for keystash binaries.
//!
//! Library crates only emit `tracing` events; a binary calls
//! [`setup_logging`] once to install the global subscriber.
//!
//! # Example
//!
//! ```rust,no_run
//! use keystash_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), keystash_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Json)
//!     .with_directive("keystash_storage=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
