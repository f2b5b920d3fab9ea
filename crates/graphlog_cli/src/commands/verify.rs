//! Verify command implementation.

use super::CliError;
use graphlog_core::{
    open_log_file, read_log_header, recover, repair_torn_tail, LogConfig, RecoveryOutcome,
};
use graphlog_storage::WritableLogChannel;
use std::path::Path;
use tracing::{info, warn};

/// Verification result.
#[derive(Debug)]
pub struct VerifyResult {
    /// Number of complete commands read.
    pub commands_checked: usize,
    /// Offset just past the last complete command.
    pub last_valid_offset: u64,
    /// Bytes after the last complete command.
    pub torn_bytes: u64,
    /// Whether the torn tail was cut off.
    pub repaired: bool,
    /// List of errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn new() -> Self {
        Self {
            commands_checked: 0,
            last_valid_offset: 0,
            torn_bytes: 0,
            repaired: false,
            errors: Vec::new(),
        }
    }

    /// Returns `true` if the log is usable as it now stands on disk.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty() && (self.torn_bytes == 0 || self.repaired)
    }
}

/// Runs the verify command.
pub fn run(path: &Path, repair: bool) -> Result<(), CliError> {
    println!("Verifying log file {:?}", path);
    println!();

    let result = verify_log(path, repair, &LogConfig::default())?;
    print_result(&result);

    println!();
    if result.is_ok() {
        println!("✓ Log verification passed");
        Ok(())
    } else {
        println!("✗ Log verification failed");
        Err(CliError::VerificationFailed)
    }
}

/// Reads every command of the log at `path`, optionally cutting off a torn
/// tail.
///
/// Corrupt entries are reported in [`VerifyResult::errors`] rather than
/// returned as an error, and are never repaired.
pub fn verify_log(path: &Path, repair: bool, config: &LogConfig) -> Result<VerifyResult, CliError> {
    if !path.exists() {
        return Err(CliError::NotFound(path.to_path_buf()));
    }
    let size = std::fs::metadata(path)?.len();
    let mut result = VerifyResult::new();

    let outcome = if repair {
        repair_torn_tail(path, config)
    } else {
        check_only(path, config)
    };

    match outcome {
        Ok(outcome) => {
            result.commands_checked = outcome.commands_recovered;
            result.last_valid_offset = outcome.last_valid_position.byte_offset();
            result.torn_bytes = size.saturating_sub(result.last_valid_offset);
            result.repaired = repair && outcome.torn_tail;
            info!(
                path = %path.display(),
                commands = result.commands_checked,
                torn_bytes = result.torn_bytes,
                repaired = result.repaired,
                "log verified"
            );
        }
        Err(e) if e.is_corruption() => {
            warn!(path = %path.display(), error = %e, "log is corrupt");
            result.errors.push(e.to_string());
        }
        Err(e) => return Err(e.into()),
    }

    Ok(result)
}

fn check_only(path: &Path, config: &LogConfig) -> graphlog_core::CoreResult<RecoveryOutcome> {
    let Some(header) = read_log_header(path)? else {
        return Ok(RecoveryOutcome {
            commands_recovered: 0,
            last_valid_position: graphlog_storage::LogPosition::START,
            torn_tail: std::fs::metadata(path).is_ok_and(|m| m.len() > 0),
        });
    };
    let (mut channel, _) = open_log_file(path, header, config)?;
    let outcome = recover(&mut channel, |_, _| Ok(()))?;
    channel.close()?;
    Ok(outcome)
}

fn print_result(result: &VerifyResult) {
    println!(
        "  commands checked: {}, last valid offset: {}",
        result.commands_checked, result.last_valid_offset
    );
    if result.torn_bytes > 0 {
        if result.repaired {
            println!("  torn tail of {} bytes removed", result.torn_bytes);
        } else {
            println!(
                "  torn tail of {} bytes (run with --repair to remove it)",
                result.torn_bytes
            );
        }
    }
    for error in &result.errors {
        println!("    ERROR: {}", error);
    }
}
