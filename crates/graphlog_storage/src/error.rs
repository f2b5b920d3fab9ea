//! Error types for log channel operations.

use std::io;
use thiserror::Error;

/// Result type for log channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors that can occur during log channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read more bytes than remain in the channel.
    ///
    /// This is the signal the command reader turns into an "incomplete"
    /// result: the log ends before the requested bytes.
    #[error("read past end of log: offset {offset}, requested {requested}, available {available}")]
    ReadPastEnd {
        /// Byte offset at which the read was attempted.
        offset: u64,
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes that were available.
        available: u64,
    },

    /// The log file is malformed at the channel level.
    #[error("log corrupted: {0}")]
    Corrupted(String),

    /// The channel has been closed.
    #[error("log channel is closed")]
    Closed,

    /// Another process holds the log file lock.
    #[error("log file locked: {0}")]
    Locked(String),
}

impl ChannelError {
    /// Returns `true` if this error means the log ended before the
    /// requested bytes.
    #[must_use]
    pub fn is_read_past_end(&self) -> bool {
        matches!(self, Self::ReadPastEnd { .. })
    }

    /// Returns the underlying I/O error, if any.
    #[must_use]
    pub fn as_io(&self) -> Option<&io::Error> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}
