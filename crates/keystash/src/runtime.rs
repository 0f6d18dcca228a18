//! Runtime classification.
//!
//! When a call does not force a backend, the facade asks its
//! [`RuntimeClassifier`] which kind of process it is running in and routes
//! to the matching slot. The classifier is consulted on every call.

use keystash_storage::Slot;

/// The kind of process the facade is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Runtime {
    /// Native mobile runtime.
    Native,
    /// Server-side request handling.
    Server,
    /// Web client.
    Web,
}

impl Runtime {
    /// The slot this runtime routes to.
    #[must_use]
    pub const fn slot(self) -> Slot {
        match self {
            Self::Native => Slot::Native,
            Self::Server => Slot::Ssr,
            Self::Web => Slot::Web,
        }
    }
}

/// Decides which [`Runtime`] the current call runs in.
pub trait RuntimeClassifier: Send + Sync {
    /// Classify the current runtime.
    fn classify(&self) -> Runtime;
}

/// Classifies by compilation target.
///
/// Android and iOS targets are native, `wasm32-unknown-unknown` is a web
/// client, everything else is a server.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformClassifier;

impl RuntimeClassifier for PlatformClassifier {
    fn classify(&self) -> Runtime {
        if cfg!(any(target_os = "android", target_os = "ios")) {
            Runtime::Native
        } else if cfg!(all(target_arch = "wasm32", target_os = "unknown")) {
            Runtime::Web
        } else {
            Runtime::Server
        }
    }
}

/// Always reports the same runtime.
#[derive(Debug, Clone, Copy)]
pub struct FixedClassifier(pub Runtime);

impl RuntimeClassifier for FixedClassifier {
    fn classify(&self) -> Runtime {
        self.0
    }
}

impl<F> RuntimeClassifier for F
where
    F: Fn() -> Runtime + Send + Sync,
{
    fn classify(&self) -> Runtime {
        self()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[test]
    fn test_runtime_slots() {
        assert_eq!(Runtime::Native.slot(), Slot::Native);
        assert_eq!(Runtime::Server.slot(), Slot::Ssr);
        assert_eq!(Runtime::Web.slot(), Slot::Web);
    }

    #[test]
    fn test_platform_classifier_on_host() {
        // Tests run on a host target, never on a mobile or browser one.
        assert_eq!(PlatformClassifier.classify(), Runtime::Server);
    }

    #[test]
    fn test_closure_classifier_is_reevaluated() {
        let native = AtomicBool::new(false);
        let classifier = || {
            if native.load(Ordering::SeqCst) {
                Runtime::Native
            } else {
                Runtime::Web
            }
        };
        assert_eq!(classifier.classify(), Runtime::Web);
        native.store(true, Ordering::SeqCst);
        assert_eq!(classifier.classify(), Runtime::Native);
        assert_eq!(FixedClassifier(Runtime::Server).classify(), Runtime::Server);
    }
}
