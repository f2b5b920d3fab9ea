//! Cross-crate integration test helpers.
//!
//! Provides utilities for testing the codec, recovery and transaction log
//! of `graphlog_core` against the channels of `graphlog_storage`.

use graphlog_core::{
    open_log_file, recover, Command, CommandReader, KernelHealth, LogConfig, LogHeader,
    TransactionLog,
};
use graphlog_storage::{InMemoryLogChannel, WritableLogChannel};
use std::path::Path;
use std::sync::Arc;

/// A test harness for integration testing.
///
/// Commits transactions through a [`TransactionLog`] and tracks every
/// command so the log contents can be verified by replaying them.
pub struct IntegrationHarness {
    /// The transaction log under test.
    pub log: TransactionLog<InMemoryLogChannel>,
    committed: Vec<Command>,
}

impl IntegrationHarness {
    /// Creates a new integration harness over an in-memory channel.
    pub fn new() -> Self {
        Self::with_config(LogConfig::default())
    }

    /// Creates a harness with the given configuration.
    pub fn with_config(config: LogConfig) -> Self {
        Self {
            log: TransactionLog::new(
                InMemoryLogChannel::new(),
                Arc::new(KernelHealth::new()),
                config,
            ),
            committed: Vec::new(),
        }
    }

    /// Commits `commands` as one transaction and tracks them.
    pub fn commit(&mut self, commands: &[Command]) -> usize {
        let written = self
            .log
            .write_transaction(commands)
            .expect("Failed to write transaction");
        self.committed.extend_from_slice(commands);
        written
    }

    /// Replays the log from the start.
    pub fn replay(&self) -> Vec<Command> {
        let bytes = self.log.with_channel(|channel| channel.to_bytes());
        let mut channel = InMemoryLogChannel::with_data(&bytes);
        let mut replayed = Vec::new();
        let outcome = recover(&mut channel, |_, command| {
            replayed.push(command);
            Ok(())
        })
        .expect("Failed to recover");
        assert!(!outcome.torn_tail, "log written without failure is torn");
        replayed
    }

    /// Verifies the log replays exactly the tracked commands.
    pub fn verify_all(&self) {
        assert_eq!(self.replay(), self.committed, "Replayed commands differ");
    }

    /// Returns the count of tracked commands.
    pub fn tracked_count(&self) -> usize {
        self.committed.len()
    }
}

impl Default for IntegrationHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Asserts that every prefix of the encoding of `commands` reads back as
/// the commands that fit entirely, followed by "incomplete".
///
/// Returns the number of cut points checked.
pub fn assert_handles_truncation(commands: &[Command]) -> usize {
    let bytes = crate::fixtures::write_commands(commands).to_bytes();

    let mut boundaries = Vec::with_capacity(commands.len() + 1);
    boundaries.push(0usize);
    for command in commands {
        let end = boundaries.last().copied().unwrap_or(0);
        boundaries.push(end + crate::fixtures::encode_command(command).len());
    }

    for cut in 0..=bytes.len() {
        let mut channel = InMemoryLogChannel::with_data(&bytes[..cut]);
        let complete = boundaries.iter().filter(|&&b| b != 0 && b <= cut).count();

        for (i, expected) in commands[..complete].iter().enumerate() {
            let read = CommandReader::read(&mut channel)
                .unwrap_or_else(|e| panic!("cut at {cut}: command {i} failed: {e}"));
            assert_eq!(read.as_ref(), Some(expected), "cut at {cut}: command {i}");
        }
        let rest = CommandReader::read(&mut channel)
            .unwrap_or_else(|e| panic!("cut at {cut}: tail failed: {e}"));
        assert_eq!(rest, None, "cut at {cut}: expected incomplete tail");
    }
    bytes.len() + 1
}

/// File log helpers.
pub mod file_log {
    use super::*;

    /// Creates the log file at `path` with a header for `log_version` and
    /// appends `commands` as one forced transaction.
    pub fn write_file_log(path: &Path, log_version: u64, commands: &[Command]) {
        let config = LogConfig::default();
        let (channel, _) = open_log_file(path, LogHeader::new(log_version, 0), &config)
            .expect("Failed to open log file");
        let log = TransactionLog::new(channel, Arc::new(KernelHealth::new()), config);
        log.write_transaction(commands)
            .expect("Failed to write transaction");
        log.close().expect("Failed to close log");
    }

    /// Reopens the log file at `path` and replays every complete command.
    pub fn replay_file_log(path: &Path, log_version: u64) -> Vec<Command> {
        let (mut channel, _) = open_log_file(
            path,
            LogHeader::new(log_version, 0),
            &LogConfig::default(),
        )
        .expect("Failed to open log file");
        let mut replayed = Vec::new();
        recover(&mut channel, |_, command| {
            replayed.push(command);
            Ok(())
        })
        .expect("Failed to recover");
        channel.close().expect("Failed to close log");
        replayed
    }
}

#[cfg(test)]
mod tests {
    use super::file_log::{replay_file_log, write_file_log};
    use super::*;
    use crate::fixtures::{node_12_command, sample_commands, schema_rule_commands};
    use graphlog_core::{
        read_log_header, repair_torn_tail, CommandWriter, CoreError, NeoStoreRecord,
        LOG_HEADER_SIZE,
    };
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_sample_commands_roundtrip() {
        let commands = sample_commands();
        let mut channel = crate::fixtures::write_commands(&commands);
        for expected in &commands {
            assert_eq!(CommandReader::read(&mut channel).unwrap().as_ref(), Some(expected));
        }
        assert_eq!(CommandReader::read(&mut channel).unwrap(), None);
    }

    #[test]
    fn test_node_12_truncation() {
        let commands = vec![node_12_command(), node_12_command()];
        let cuts = assert_handles_truncation(&commands);
        assert_eq!(cuts, 2 * 75 + 1);
    }

    #[test]
    fn test_sample_commands_truncation() {
        assert_handles_truncation(&sample_commands());
        assert_handles_truncation(&schema_rule_commands());
    }

    #[test]
    fn test_unknown_tag_after_valid_entry() {
        let mut channel = crate::fixtures::write_commands(&[node_12_command()]);
        channel.put(42).unwrap();

        assert_eq!(CommandReader::read(&mut channel).unwrap(), Some(node_12_command()));
        let err = CommandReader::read(&mut channel).unwrap_err();
        assert!(matches!(err, CoreError::UnknownCommandTag { tag: 42, .. }));
    }

    #[test]
    fn test_harness_tracks_transactions() {
        let mut harness = IntegrationHarness::new();
        harness.commit(&sample_commands());
        harness.commit(&[node_12_command()]);
        harness.commit(&schema_rule_commands());

        assert_eq!(harness.tracked_count(), sample_commands().len() + 1 + 3);
        harness.verify_all();
    }

    #[test]
    fn test_write_position_advances_by_entry_size() {
        let harness = IntegrationHarness::new();
        let before = harness.log.write_position().byte_offset();
        let written = harness
            .log
            .write_command_entry(&node_12_command())
            .unwrap();
        assert_eq!(written, 75);
        assert_eq!(harness.log.write_position().byte_offset(), before + 75);
    }

    #[test]
    fn test_file_log_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.log.2");
        write_file_log(&path, 2, &sample_commands());

        assert_eq!(read_log_header(&path).unwrap(), Some(LogHeader::new(2, 0)));
        assert_eq!(replay_file_log(&path, 2), sample_commands());
    }

    #[test]
    fn test_file_log_torn_tail_is_repaired() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.log.0");
        write_file_log(&path, 0, &[node_12_command()]);

        let torn = crate::fixtures::encode_command(&sample_commands()[1]);
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&torn[..torn.len() / 2]).unwrap();
        }

        let outcome = repair_torn_tail(&path, &LogConfig::default()).unwrap();
        assert!(outcome.torn_tail);
        assert_eq!(outcome.commands_recovered, 1);
        assert_eq!(
            outcome.last_valid_position.byte_offset(),
            (LOG_HEADER_SIZE + 75) as u64
        );
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            (LOG_HEADER_SIZE + 75) as u64
        );

        let again = repair_torn_tail(&path, &LogConfig::default()).unwrap();
        assert!(!again.torn_tail);
        assert_eq!(replay_file_log(&path, 0), vec![node_12_command()]);
    }

    #[test]
    fn test_file_log_wrong_version_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.log.5");
        write_file_log(&path, 5, &[]);

        let err = open_log_file(&path, LogHeader::new(6, 0), &LogConfig::default()).unwrap_err();
        assert!(matches!(err, CoreError::Corruption { .. }));
    }

    #[test]
    fn test_append_after_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.log.1");
        write_file_log(&path, 1, &[node_12_command()]);

        let extra = Command::NeoStore {
            before: NeoStoreRecord::default(),
            after: NeoStoreRecord { next_prop: 9 },
        };
        {
            let config = LogConfig::default();
            let (mut channel, _) =
                open_log_file(&path, LogHeader::new(1, 0), &config).unwrap();
            recover(&mut channel, |_, _| Ok(())).unwrap();
            CommandWriter::write_command_entry(&mut channel, &extra).unwrap();
            channel.force().unwrap();
            channel.close().unwrap();
        }

        assert_eq!(replay_file_log(&path, 1), vec![node_12_command(), extra]);
    }
}
