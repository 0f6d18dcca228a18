//! Storage error types.

use crate::options::Slot;

/// Errors from facade and backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StashError {
    /// The backend's medium cannot perform the requested operation.
    #[error("{operation}() is not supported by the {backend} backend")]
    UnsupportedOperation {
        /// Name of the backend that rejected the call.
        backend: &'static str,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// A context-scoped backend was called without a request context.
    #[error("{operation}() on the {backend} backend requires a request context")]
    MissingContext {
        /// Name of the backend that rejected the call.
        backend: &'static str,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// The routing slot resolved for this call has no backend bound.
    #[error("no backend bound to the {slot} slot")]
    BackendUnavailable {
        /// The unbound slot.
        slot: Slot,
    },

    /// A stored value (or a supplied default) could not be decoded.
    #[error("failed to decode value for key '{key}': {message}")]
    Decode {
        /// Logical key being read.
        key: String,
        /// Decoder failure description.
        message: String,
    },

    /// A value could not be encoded for storage.
    #[error("failed to encode value: {0}")]
    Encode(String),

    /// The key is invalid.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The namespace identifier is invalid.
    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),

    /// An environment model is malformed.
    #[error("invalid env model: {0}")]
    InvalidModel(String),

    /// The underlying medium failed to read or write.
    #[error("io error: {0}")]
    Io(String),

    /// A storage operation failed internally.
    #[error("storage error: {0}")]
    Internal(String),
}

impl StashError {
    /// Shorthand for [`StashError::Decode`].
    pub fn decode(key: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Decode {
            key: key.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for storage operations.
pub type StashResult<T> = Result<T, StashError>;
