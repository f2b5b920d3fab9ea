//! Error types for graphlog core.

use crate::kernel::PanicCause;
use graphlog_storage::LogPosition;
use std::sync::Arc;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in graphlog core operations.
///
/// There is no truncation variant: a log that ends mid-command is reported
/// as `Ok(None)` by the reader, never as an error.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Log channel error.
    #[error("log channel error: {0}")]
    Channel(#[from] graphlog_storage::ChannelError),

    /// A command tag that no known command kind uses.
    #[error("unknown command tag {tag} at {position}")]
    UnknownCommandTag {
        /// The tag byte read from the log.
        tag: u8,
        /// Position of the tag byte.
        position: LogPosition,
    },

    /// A structurally invalid command or log header.
    #[error("log corruption: {message}")]
    Corruption {
        /// Description of the corruption.
        message: String,
    },

    /// The kernel has panicked and refuses further mutation.
    #[error(
        "Kernel has encountered some problem, please perform necessary action \
         (tx recovery/restart). Original cause: {cause}"
    )]
    KernelPanicked {
        /// The failure that caused the panic.
        cause: Arc<PanicCause>,
    },

    /// The event handler instance is already registered.
    #[error("kernel event handler already registered")]
    HandlerAlreadyRegistered,

    /// An argument was rejected before anything was written.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// A configuration setting could not be parsed.
    #[error("invalid setting '{key}': {message}")]
    InvalidConfig {
        /// Setting name.
        key: String,
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid config error.
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for errors that mean the log content is broken, as
    /// opposed to the log merely ending early.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::UnknownCommandTag { .. } | Self::Corruption { .. }
        ) || matches!(self, Self::Channel(graphlog_storage::ChannelError::Corrupted(_)))
    }

    /// Returns `true` if the log ended before the requested bytes.
    #[must_use]
    pub fn is_read_past_end(&self) -> bool {
        matches!(self, Self::Channel(e) if e.is_read_past_end())
    }
}
