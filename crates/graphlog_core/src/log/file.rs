//! Opening and repairing physical log files.

use super::header::{LogHeader, LOG_HEADER_SIZE};
use super::iterator::{recover, RecoveryOutcome};
use crate::config::LogConfig;
use crate::error::{CoreError, CoreResult};
use graphlog_storage::{
    ChannelError, FileLogChannel, InMemoryLogChannel, LogPosition, WritableLogChannel,
};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Reads the header of the log file at `path` without locking it.
///
/// Returns `Ok(None)` if the file is shorter than a header.
///
/// # Errors
///
/// Returns an error if the file cannot be read or carries an unsupported
/// format version.
pub fn read_log_header(path: &Path) -> CoreResult<Option<LogHeader>> {
    let file = File::open(path).map_err(ChannelError::from)?;
    let mut bytes = Vec::with_capacity(LOG_HEADER_SIZE);
    file.take(LOG_HEADER_SIZE as u64)
        .read_to_end(&mut bytes)
        .map_err(ChannelError::from)?;
    LogHeader::read(&mut InMemoryLogChannel::with_data(&bytes))
}

/// Opens the log file at `path` for recovery and appending.
///
/// A new (or empty) file gets `header` written and forced. An existing file
/// must carry the same log version as `header`; its stored header is
/// returned. The channel's read position is left just past the header, so
/// the caller can run [`recover`] before appending.
///
/// # Errors
///
/// Returns [`CoreError::Corruption`] if the stored header names a different
/// log version or is torn, and channel errors from opening the file.
pub fn open_log_file(
    path: &Path,
    header: LogHeader,
    config: &LogConfig,
) -> CoreResult<(FileLogChannel, LogHeader)> {
    let mut channel = FileLogChannel::open_with(path, config.channel_options(header.log_version))?;

    if channel.size() == 0 {
        header.write(&mut channel)?;
        channel.force()?;
        // Reads start at offset 0; skip over the header just written.
        LogHeader::read(&mut channel)?;
        info!(path = %path.display(), log_version = header.log_version, "created log file");
        return Ok((channel, header));
    }

    let stored = LogHeader::read(&mut channel)?.ok_or_else(|| {
        CoreError::corruption(format!("log file {} has a torn header", path.display()))
    })?;
    if stored.log_version != header.log_version {
        return Err(CoreError::corruption(format!(
            "log file {} holds log version {}, expected {}",
            path.display(),
            stored.log_version,
            header.log_version
        )));
    }
    Ok((channel, stored))
}

/// Recovers the log file at `path` and cuts off a torn tail.
///
/// Commands are only validated, not applied. A file shorter than a header
/// is emptied.
///
/// # Errors
///
/// Fails on corrupt content (which is left untouched) or I/O errors.
pub fn repair_torn_tail(path: &Path, config: &LogConfig) -> CoreResult<RecoveryOutcome> {
    let Some(header) = read_log_header(path)? else {
        let mut channel = FileLogChannel::open_with(path, config.channel_options(0))?;
        let torn_tail = channel.size() > 0;
        if torn_tail {
            warn!(path = %path.display(), bytes = channel.size(), "removing torn log header");
            channel.truncate_to(0)?;
        }
        channel.close()?;
        return Ok(RecoveryOutcome {
            commands_recovered: 0,
            last_valid_position: LogPosition::START,
            torn_tail,
        });
    };

    let (mut channel, _) = open_log_file(path, header, config)?;
    let outcome = recover(&mut channel, |_, _| Ok(()))?;
    if outcome.torn_tail {
        let keep = outcome.last_valid_position.byte_offset();
        warn!(
            path = %path.display(),
            from = channel.size(),
            to = keep,
            "truncating torn tail"
        );
        channel.truncate_to(keep)?;
    }
    channel.close()?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::log::CommandWriter;
    use crate::record::NodeRecord;
    use tempfile::tempdir;

    fn node(id: i64) -> Command {
        Command::Node {
            before: NodeRecord::new(id),
            after: NodeRecord::in_use(id, false, 13, 13),
        }
    }

    #[test]
    fn creates_header_on_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.log.4");
        let (mut channel, header) =
            open_log_file(&path, LogHeader::new(4, 17), &LogConfig::default()).unwrap();
        assert_eq!(header, LogHeader::new(4, 17));
        assert_eq!(channel.size(), LOG_HEADER_SIZE as u64);
        channel.close().unwrap();

        assert_eq!(read_log_header(&path).unwrap(), Some(LogHeader::new(4, 17)));
    }

    #[test]
    fn rejects_mismatched_log_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.log.1");
        let (mut channel, _) =
            open_log_file(&path, LogHeader::new(1, 0), &LogConfig::default()).unwrap();
        channel.close().unwrap();

        let err = open_log_file(&path, LogHeader::new(2, 0), &LogConfig::default()).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn repair_truncates_torn_tail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.log.0");
        let config = LogConfig::default();

        let (mut channel, _) = open_log_file(&path, LogHeader::new(0, 0), &config).unwrap();
        CommandWriter::write_command_entry(&mut channel, &node(1)).unwrap();
        let valid_len = channel.size();
        CommandWriter::write_command_entry(&mut channel, &node(2)).unwrap();
        channel.truncate_to(channel.size() - 5).unwrap();
        channel.close().unwrap();

        let outcome = repair_torn_tail(&path, &config).unwrap();
        assert!(outcome.torn_tail);
        assert_eq!(outcome.commands_recovered, 1);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), valid_len);

        let outcome = repair_torn_tail(&path, &config).unwrap();
        assert!(!outcome.torn_tail);
        assert_eq!(outcome.commands_recovered, 1);
    }

    #[test]
    fn repair_empties_torn_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.log.0");
        std::fs::write(&path, [1u8, 0, 0]).unwrap();

        let outcome = repair_torn_tail(&path, &LogConfig::default()).unwrap();
        assert!(outcome.torn_tail);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }
}
