//! Kernel health: the one-way healthy → panicked switch.

use super::events::KernelEventHandlers;
use crate::error::{CoreError, CoreResult};
use graphlog_storage::ChannelError;
use std::fmt;
use std::io;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error};

/// Classification of the failure that panicked the kernel, as reported to
/// event handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorState {
    /// The storage device ran out of space.
    StorageMediaFull,
    /// An allocation failed.
    OutOfMemory,
    /// Anything else.
    Unknown,
}

impl ErrorState {
    /// Classifies an I/O error.
    #[must_use]
    pub fn classify_io(err: &io::Error) -> Self {
        if err.kind() == io::ErrorKind::OutOfMemory {
            return Self::OutOfMemory;
        }
        match err.raw_os_error() {
            Some(code) if is_storage_full(code) => Self::StorageMediaFull,
            _ => Self::Unknown,
        }
    }

    /// Classifies a channel error.
    #[must_use]
    pub fn classify(err: &ChannelError) -> Self {
        err.as_io().map_or(Self::Unknown, Self::classify_io)
    }
}

#[cfg(unix)]
fn is_storage_full(code: i32) -> bool {
    // ENOSPC
    code == 28
}

#[cfg(windows)]
fn is_storage_full(code: i32) -> bool {
    // ERROR_DISK_FULL, ERROR_HANDLE_DISK_FULL
    code == 112 || code == 39
}

#[cfg(not(any(unix, windows)))]
fn is_storage_full(_code: i32) -> bool {
    false
}

impl fmt::Display for ErrorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageMediaFull => f.write_str("storage media full"),
            Self::OutOfMemory => f.write_str("out of memory"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// The failure recorded when the kernel panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicCause {
    error_state: ErrorState,
    message: String,
}

impl PanicCause {
    /// Creates a cause.
    pub fn new(error_state: ErrorState, message: impl Into<String>) -> Self {
        Self {
            error_state,
            message: message.into(),
        }
    }

    /// Creates a cause from a failed channel operation.
    pub fn from_channel_error(context: &str, err: &ChannelError) -> Self {
        Self::new(ErrorState::classify(err), format!("{context}: {err}"))
    }

    /// Returns the failure classification.
    #[must_use]
    pub fn error_state(&self) -> ErrorState {
        self.error_state
    }

    /// Returns the failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PanicCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.error_state)
    }
}

impl std::error::Error for PanicCause {}

/// Process-wide health flag of the storage kernel.
///
/// Starts healthy and transitions to panicked at most once; the first
/// cause wins and is kept for the lifetime of the value. After the
/// transition every [`assert_healthy`](Self::assert_healthy) fails with the
/// recorded cause.
///
/// Reading the state never blocks. Share it as `Arc<KernelHealth>`.
///
/// # Example
///
/// ```rust
/// use graphlog_core::{ErrorState, KernelHealth, PanicCause};
///
/// let health = KernelHealth::new();
/// assert!(health.assert_healthy().is_ok());
///
/// assert!(health.panic(PanicCause::new(ErrorState::Unknown, "disk gone")));
/// assert!(health.assert_healthy().is_err());
/// ```
#[derive(Debug, Default)]
pub struct KernelHealth {
    cause: OnceLock<Arc<PanicCause>>,
    handlers: KernelEventHandlers,
}

impl KernelHealth {
    /// Creates a healthy kernel with no event handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handlers notified on panic and shutdown.
    #[must_use]
    pub fn handlers(&self) -> &KernelEventHandlers {
        &self.handlers
    }

    /// Returns `true` until the kernel panics.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.cause.get().is_none()
    }

    /// Returns the recorded panic cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<Arc<PanicCause>> {
        self.cause.get().cloned()
    }

    /// Fails if the kernel has panicked.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::KernelPanicked`] carrying the original cause.
    pub fn assert_healthy(&self) -> CoreResult<()> {
        match self.cause.get() {
            None => Ok(()),
            Some(cause) => Err(CoreError::KernelPanicked {
                cause: Arc::clone(cause),
            }),
        }
    }

    /// Marks the kernel as panicked.
    ///
    /// Only the first call records its cause and notifies the registered
    /// handlers; later calls are ignored. Returns `true` if this call made
    /// the transition.
    pub fn panic(&self, cause: PanicCause) -> bool {
        let cause = Arc::new(cause);
        if self.cause.set(Arc::clone(&cause)).is_err() {
            debug!(ignored = %cause, "kernel already panicked");
            return false;
        }

        error!(
            error_state = %cause.error_state(),
            cause = %cause.message(),
            "kernel panic: the database requires recovery"
        );
        self.handlers.notify_kernel_panic(&cause);
        true
    }

    /// Notifies handlers that the kernel is shutting down.
    pub fn shutdown(&self) {
        self.handlers.notify_before_shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_healthy() {
        let health = KernelHealth::new();
        assert!(health.is_healthy());
        assert!(health.cause().is_none());
        assert!(health.assert_healthy().is_ok());
    }

    #[test]
    fn first_cause_wins() {
        let health = KernelHealth::new();
        assert!(health.panic(PanicCause::new(ErrorState::Unknown, "first")));
        assert!(!health.panic(PanicCause::new(ErrorState::OutOfMemory, "second")));

        let cause = health.cause().unwrap();
        assert_eq!(cause.message(), "first");
        assert_eq!(cause.error_state(), ErrorState::Unknown);
    }

    #[test]
    fn assert_healthy_reports_cause() {
        let health = KernelHealth::new();
        health.panic(PanicCause::new(ErrorState::Unknown, "write failed"));

        let err = health.assert_healthy().unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("Kernel has encountered some problem"));
        assert!(text.contains("write failed"));
        match err {
            CoreError::KernelPanicked { cause } => assert_eq!(cause.message(), "write failed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn classify_io() {
        let oom = io::Error::from(io::ErrorKind::OutOfMemory);
        assert_eq!(ErrorState::classify_io(&oom), ErrorState::OutOfMemory);

        let other = io::Error::new(io::ErrorKind::Other, "boom");
        assert_eq!(ErrorState::classify_io(&other), ErrorState::Unknown);
    }

    #[cfg(unix)]
    #[test]
    fn classify_disk_full() {
        let full = io::Error::from_raw_os_error(28);
        assert_eq!(ErrorState::classify_io(&full), ErrorState::StorageMediaFull);

        let err = ChannelError::Io(io::Error::from_raw_os_error(28));
        assert_eq!(ErrorState::classify(&err), ErrorState::StorageMediaFull);
        assert_eq!(ErrorState::classify(&ChannelError::Closed), ErrorState::Unknown);
    }

    #[test]
    fn shutdown_reaches_every_handler() {
        use crate::kernel::KernelEventHandler;
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Counting(AtomicUsize);
        impl KernelEventHandler for Counting {
            fn kernel_panic(&self, _error: ErrorState, _cause: &PanicCause) {}

            fn before_shutdown(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        struct Failing;
        impl KernelEventHandler for Failing {
            fn kernel_panic(&self, _error: ErrorState, _cause: &PanicCause) {}

            fn before_shutdown(&self) {
                panic!("cannot shut down");
            }
        }

        let health = KernelHealth::new();
        let first = Arc::new(Counting(AtomicUsize::new(0)));
        let last = Arc::new(Counting(AtomicUsize::new(0)));
        health.handlers().register(first.clone()).unwrap();
        health.handlers().register(Arc::new(Failing)).unwrap();
        health.handlers().register(last.clone()).unwrap();

        health.shutdown();
        assert_eq!(first.0.load(Ordering::SeqCst), 1);
        assert_eq!(last.0.load(Ordering::SeqCst), 1);
        assert!(health.is_healthy());
    }
}
