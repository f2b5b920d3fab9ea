//! Streaming command iteration and recovery.
//!
//! Recovery replays every complete command in a log and stops at the first
//! incomplete one. Whatever follows the last complete command is a torn
//! tail left by a crash mid-write; it is reported, never replayed.

use super::reader::CommandReader;
use crate::command::Command;
use crate::error::CoreResult;
use graphlog_storage::{LogPosition, ReadableLogChannel};
use tracing::{debug, info, warn};

/// A streaming iterator over the commands of a log channel.
///
/// Yields `(position, command)` pairs, where `position` is where the entry
/// starts. Iteration ends at the end of the log, at the first incomplete
/// entry, or after the first error.
///
/// # Example
///
/// ```rust
/// use graphlog_core::{Command, CommandIterator, CommandWriter, NeoStoreRecord};
/// use graphlog_storage::InMemoryLogChannel;
///
/// let mut channel = InMemoryLogChannel::new();
/// let cmd = Command::NeoStore {
///     before: NeoStoreRecord::default(),
///     after: NeoStoreRecord { next_prop: 3 },
/// };
/// CommandWriter::write_command_entry(&mut channel, &cmd).unwrap();
///
/// let commands: Vec<_> = CommandIterator::new(&mut channel)
///     .map(|r| r.unwrap().1)
///     .collect();
/// assert_eq!(commands, vec![cmd]);
/// ```
pub struct CommandIterator<'a, C: ReadableLogChannel + ?Sized> {
    channel: &'a mut C,
    last_valid: LogPosition,
    torn_tail: bool,
    finished: bool,
}

impl<'a, C: ReadableLogChannel + ?Sized> CommandIterator<'a, C> {
    /// Creates an iterator reading from the channel's current position.
    pub fn new(channel: &'a mut C) -> Self {
        let last_valid = channel.current_position();
        Self {
            channel,
            last_valid,
            torn_tail: false,
            finished: false,
        }
    }

    /// Position just past the last complete command read so far.
    #[must_use]
    pub fn last_valid_position(&self) -> LogPosition {
        self.last_valid
    }

    /// Returns `true` if iteration stopped at an incomplete entry.
    #[must_use]
    pub fn torn_tail(&self) -> bool {
        self.torn_tail
    }

    fn read_next(&mut self) -> CoreResult<Option<(LogPosition, Command)>> {
        let start = self.channel.current_position();
        match CommandReader::read(&mut *self.channel)? {
            Some(command) => {
                self.last_valid = self.channel.current_position();
                Ok(Some((start, command)))
            }
            None => {
                self.torn_tail = self.channel.current_position() != self.last_valid
                    || self.channel.has_more_data()?;
                Ok(None)
            }
        }
    }
}

impl<C: ReadableLogChannel + ?Sized> Iterator for CommandIterator<'_, C> {
    type Item = CoreResult<(LogPosition, Command)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_next() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Summary of a recovery pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryOutcome {
    /// Number of complete commands handed to the apply callback.
    pub commands_recovered: usize,
    /// Position just past the last complete command.
    pub last_valid_position: LogPosition,
    /// Whether bytes of an incomplete command follow the last valid position.
    pub torn_tail: bool,
}

/// Replays every complete command of `channel` through `apply`, in log
/// order.
///
/// # Errors
///
/// Fails on the first corrupt entry, channel error or error returned by
/// `apply`. Commands before the failure have already been applied.
pub fn recover<C, F>(channel: &mut C, mut apply: F) -> CoreResult<RecoveryOutcome>
where
    C: ReadableLogChannel + ?Sized,
    F: FnMut(LogPosition, Command) -> CoreResult<()>,
{
    let mut iter = CommandIterator::new(channel);
    let mut commands_recovered = 0usize;

    for item in iter.by_ref() {
        let (position, command) = item?;
        debug!(%position, kind = %command.kind(), "replaying command");
        apply(position, command)?;
        commands_recovered += 1;
    }

    let outcome = RecoveryOutcome {
        commands_recovered,
        last_valid_position: iter.last_valid_position(),
        torn_tail: iter.torn_tail(),
    };

    if outcome.torn_tail {
        warn!(
            last_valid = %outcome.last_valid_position,
            "log ends with an incomplete command, discarding torn tail"
        );
    }
    info!(
        commands = outcome.commands_recovered,
        last_valid = %outcome.last_valid_position,
        "log recovery finished"
    );
    Ok(outcome)
}
