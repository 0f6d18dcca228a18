//! Keystash CLI library: configuration bridge and subcommand handlers
//! behind the `keystash` binary.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod bridge;
pub mod commands;
