//! CLI command implementations.

pub mod dump;
pub mod verify;

use graphlog_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The log file does not exist.
    #[error("log file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The log file is shorter than its header.
    #[error("log file {} has no complete header", .0.display())]
    MissingHeader(PathBuf),

    /// Reading or repairing the log failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Reading file metadata failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output could not be produced.
    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Verification found problems.
    #[error("verification failed")]
    VerificationFailed,
}
