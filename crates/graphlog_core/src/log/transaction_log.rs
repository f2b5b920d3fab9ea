//! The kernel's single append point into the transaction log.

use super::writer::CommandWriter;
use crate::command::Command;
use crate::config::LogConfig;
use crate::error::{CoreError, CoreResult};
use crate::kernel::{KernelHealth, PanicCause};
use graphlog_storage::{LogPosition, WritableLogChannel};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Serializes commands onto a log channel on behalf of the kernel.
///
/// All writers share one channel behind a mutex, so entries from concurrent
/// transactions never interleave. Every operation first checks kernel
/// health; a failed channel operation panics the kernel, after which the
/// log refuses all further work.
pub struct TransactionLog<C: WritableLogChannel> {
    channel: Mutex<C>,
    health: Arc<KernelHealth>,
    config: LogConfig,
}

impl<C: WritableLogChannel> TransactionLog<C> {
    /// Creates a transaction log appending to `channel`.
    pub fn new(channel: C, health: Arc<KernelHealth>, config: LogConfig) -> Self {
        Self {
            channel: Mutex::new(channel),
            health,
            config,
        }
    }

    /// Returns the kernel health this log reports to.
    #[must_use]
    pub fn health(&self) -> &Arc<KernelHealth> {
        &self.health
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Returns the position the next entry will be written at.
    pub fn write_position(&self) -> LogPosition {
        self.channel.lock().write_position()
    }

    /// Runs `f` with exclusive access to the underlying channel.
    pub fn with_channel<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.channel.lock())
    }

    /// Appends a single command entry. Returns the bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::KernelPanicked`] if the kernel is unhealthy, or
    /// the write error, in which case the kernel is now panicked.
    pub fn write_command_entry(&self, command: &Command) -> CoreResult<usize> {
        self.health.assert_healthy()?;
        let mut channel = self.channel.lock();
        CommandWriter::write_command_entry(&mut *channel, command)
            .map_err(|e| self.on_failure("writing command entry", e))
    }

    /// Appends the commands of one transaction, forcing the channel
    /// afterwards when `force_on_write` is configured. Returns the bytes
    /// written.
    ///
    /// # Errors
    ///
    /// See [`write_command_entry`](Self::write_command_entry).
    pub fn write_transaction(&self, commands: &[Command]) -> CoreResult<usize> {
        self.health.assert_healthy()?;
        let mut channel = self.channel.lock();

        let mut written = 0;
        for command in commands {
            written += CommandWriter::write_command_entry(&mut *channel, command)
                .map_err(|e| self.on_failure("writing transaction", e))?;
        }
        if self.config.force_on_write {
            channel
                .force()
                .map_err(|e| self.on_failure("forcing transaction", e.into()))?;
        }

        debug!(
            commands = commands.len(),
            bytes = written,
            position = %channel.write_position(),
            "transaction written"
        );
        Ok(written)
    }

    /// Forces everything written so far to durable storage.
    ///
    /// # Errors
    ///
    /// See [`write_command_entry`](Self::write_command_entry).
    pub fn force(&self) -> CoreResult<()> {
        self.health.assert_healthy()?;
        self.channel
            .lock()
            .force()
            .map_err(|e| self.on_failure("forcing log", e.into()))
    }

    /// Closes the underlying channel.
    ///
    /// # Errors
    ///
    /// Returns the channel error if closing fails.
    pub fn close(&self) -> CoreResult<()> {
        self.channel.lock().close()?;
        Ok(())
    }

    /// Panics the kernel if `err` came from the channel.
    fn on_failure(&self, context: &str, err: CoreError) -> CoreError {
        if let CoreError::Channel(channel_err) = &err {
            self.health
                .panic(PanicCause::from_channel_error(context, channel_err));
        }
        err
    }
}

impl<C: WritableLogChannel> std::fmt::Debug for TransactionLog<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionLog")
            .field("health", &self.health)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
