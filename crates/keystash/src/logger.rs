//! Injected logging capability.
//!
//! A [`Stash`](crate::Stash) reports what it does through an optional
//! [`Logger`]. Without one nothing is emitted. [`TracingLogger`] forwards
//! records to `tracing`; any `Fn(&LogRecord)` closure works as well.

use std::fmt;

use keystash_storage::Slot;

/// Severity of a [`LogRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Fine-grained detail.
    Trace,
    /// Routing and operation entry.
    Debug,
    /// Forced routing and resolved values.
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures.
    Error,
}

/// One event emitted by a facade.
#[derive(Clone, Copy)]
pub struct LogRecord<'a> {
    /// Severity.
    pub level: LogLevel,
    /// Facade label: `keystash` or `keystash-{id}`.
    pub instance: &'a str,
    /// Facade operation, e.g. `get_boolean`.
    pub operation: &'static str,
    /// Logical key, for keyed operations.
    pub key: Option<&'a str>,
    /// Slot the call was routed to.
    pub slot: Slot,
    /// Whether the slot came from the call's options.
    pub forced: bool,
    /// Value read or written, for `get*` and `set*`.
    pub value: Option<&'a dyn fmt::Debug>,
    /// Short description of the event.
    pub message: &'static str,
}

impl fmt::Debug for LogRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogRecord")
            .field("level", &self.level)
            .field("instance", &self.instance)
            .field("operation", &self.operation)
            .field("key", &self.key)
            .field("slot", &self.slot)
            .field("forced", &self.forced)
            .field("value", &self.value)
            .field("message", &self.message)
            .finish()
    }
}

impl fmt::Display for LogRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.instance, self.operation)?;
        if let Some(key) = self.key {
            write!(f, "({key})")?;
        }
        write!(f, " {} ({} slot)", self.message, self.slot)?;
        if let Some(value) = self.value {
            write!(f, ": {value:?}")?;
        }
        Ok(())
    }
}

/// Receives facade log records.
///
/// Implementations must not panic; logging never changes the outcome of an
/// operation.
pub trait Logger: Send + Sync {
    /// Handle one record.
    fn log(&self, record: &LogRecord<'_>);
}

impl<F> Logger for F
where
    F: Fn(&LogRecord<'_>) + Send + Sync,
{
    fn log(&self, record: &LogRecord<'_>) {
        self(record);
    }
}

/// Forwards records to `tracing` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, r: &LogRecord<'_>) {
        let slot = r.slot.as_str();
        let value = r.value;
        match r.level {
            LogLevel::Trace => tracing::trace!(
                instance = r.instance, operation = r.operation, key = r.key,
                slot, forced = r.forced, value = ?value, "{}", r.message
            ),
            LogLevel::Debug => tracing::debug!(
                instance = r.instance, operation = r.operation, key = r.key,
                slot, forced = r.forced, value = ?value, "{}", r.message
            ),
            LogLevel::Info => tracing::info!(
                instance = r.instance, operation = r.operation, key = r.key,
                slot, forced = r.forced, value = ?value, "{}", r.message
            ),
            LogLevel::Warn => tracing::warn!(
                instance = r.instance, operation = r.operation, key = r.key,
                slot, forced = r.forced, value = ?value, "{}", r.message
            ),
            LogLevel::Error => tracing::error!(
                instance = r.instance, operation = r.operation, key = r.key,
                slot, forced = r.forced, value = ?value, "{}", r.message
            ),
        }
    }
}
