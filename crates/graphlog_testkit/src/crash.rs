//! Crash simulation for the transaction log.
//!
//! This module provides a channel wrapper that fails part way through a
//! write, the way a process dies mid-append, and a harness that crashes a
//! transaction at every byte offset and checks what recovery makes of the
//! result.
//!
//! ## Test Strategy
//!
//! 1. **Crash during write** - The entry being written is left torn
//! 2. **Crash during force** - Everything was written, nothing is durable
//! 3. **After the crash** - The kernel is panicked and refuses work
//! 4. **Recovery** - Replays exactly the whole commands that were written
//!
//! ## Usage
//!
//! ```rust
//! use graphlog_testkit::crash::CrashRecoveryHarness;
//! use graphlog_testkit::fixtures::sample_commands;
//!
//! let mut harness = CrashRecoveryHarness::new(sample_commands());
//! let result = harness.crash_at(40);
//! assert!(result.passed, "{:?}", result.error);
//! ```

use graphlog_core::{recover, Command, CoreError, KernelHealth, LogConfig, TransactionLog};
use graphlog_storage::{
    ChannelError, ChannelResult, InMemoryLogChannel, LogPosition, ReadableLogChannel,
    WritableLogChannel,
};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Result of a crash recovery check.
#[derive(Debug, Clone)]
pub struct CrashRecoveryResult {
    /// Whether the check passed.
    pub passed: bool,
    /// Description of what was tested.
    pub description: String,
    /// Commands expected back from recovery.
    pub expected_commands: usize,
    /// Commands recovery actually returned.
    pub actual_commands: usize,
    /// Any error message.
    pub error: Option<String>,
}

impl CrashRecoveryResult {
    /// Creates a passing result.
    pub fn pass(description: &str, commands: usize) -> Self {
        Self {
            passed: true,
            description: description.to_string(),
            expected_commands: commands,
            actual_commands: commands,
            error: None,
        }
    }

    /// Creates a failing result.
    pub fn fail(description: &str, expected: usize, actual: usize, error: &str) -> Self {
        Self {
            passed: false,
            description: description.to_string(),
            expected_commands: expected,
            actual_commands: actual,
            error: Some(error.to_string()),
        }
    }
}

/// A log channel wrapper that can simulate crashes.
///
/// Once the configured byte budget is used up, a write stores the bytes
/// that still fit and then fails, leaving a torn entry in the inner
/// channel. Reads are passed through untouched.
pub struct CrashableChannel<C> {
    inner: C,
    crash_after_bytes: AtomicUsize,
    bytes_written: AtomicUsize,
    crashed: AtomicBool,
    fail_on_force: AtomicBool,
}

impl<C> CrashableChannel<C> {
    /// Creates a new crashable channel wrapping `inner`.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            crash_after_bytes: AtomicUsize::new(usize::MAX),
            bytes_written: AtomicUsize::new(0),
            crashed: AtomicBool::new(false),
            fail_on_force: AtomicBool::new(false),
        }
    }

    /// Sets the channel to crash once `bytes` bytes have been written.
    pub fn crash_after(&self, bytes: usize) {
        self.crash_after_bytes.store(bytes, Ordering::SeqCst);
    }

    /// Sets whether force should fail.
    pub fn set_fail_on_force(&self, fail: bool) {
        self.fail_on_force.store(fail, Ordering::SeqCst);
    }

    /// Resets the crash state.
    pub fn reset(&self) {
        self.crash_after_bytes.store(usize::MAX, Ordering::SeqCst);
        self.bytes_written.store(0, Ordering::SeqCst);
        self.crashed.store(false, Ordering::SeqCst);
        self.fail_on_force.store(false, Ordering::SeqCst);
    }

    /// Returns whether the channel has crashed.
    pub fn has_crashed(&self) -> bool {
        self.crashed.load(Ordering::SeqCst)
    }

    /// Returns the wrapped channel.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Unwraps the channel.
    pub fn into_inner(self) -> C {
        self.inner
    }

    fn crash(&self, what: &str) -> ChannelError {
        self.crashed.store(true, Ordering::SeqCst);
        ChannelError::Io(io::Error::other(format!("simulated crash during {what}")))
    }
}

impl<C: WritableLogChannel> WritableLogChannel for CrashableChannel<C> {
    fn put_bytes(&mut self, bytes: &[u8]) -> ChannelResult<&mut Self> {
        let current = self.bytes_written.fetch_add(bytes.len(), Ordering::SeqCst);
        let crash_threshold = self.crash_after_bytes.load(Ordering::SeqCst);

        if current >= crash_threshold {
            return Err(self.crash("write"));
        }

        // Check if this write will cross the crash threshold
        if current + bytes.len() > crash_threshold {
            let partial_len = crash_threshold - current;
            if partial_len > 0 {
                self.inner.put_bytes(&bytes[..partial_len])?;
            }
            return Err(self.crash("partial write"));
        }

        self.inner.put_bytes(bytes)?;
        Ok(self)
    }

    fn force(&mut self) -> ChannelResult<()> {
        if self.fail_on_force.load(Ordering::SeqCst) {
            return Err(self.crash("force"));
        }
        self.inner.force()
    }

    fn close(&mut self) -> ChannelResult<()> {
        self.inner.close()
    }

    fn write_position(&self) -> LogPosition {
        self.inner.write_position()
    }
}

impl<C: ReadableLogChannel> ReadableLogChannel for CrashableChannel<C> {
    fn get_into(&mut self, dst: &mut [u8]) -> ChannelResult<()> {
        self.inner.get_into(dst)
    }

    fn remaining(&mut self) -> ChannelResult<u64> {
        self.inner.remaining()
    }

    fn current_position(&self) -> LogPosition {
        self.inner.current_position()
    }
}

/// Crashes a transaction at chosen byte offsets and checks recovery.
pub struct CrashRecoveryHarness {
    commands: Vec<Command>,
    /// Results of the checks run so far.
    pub results: Vec<CrashRecoveryResult>,
}

impl CrashRecoveryHarness {
    /// Creates a harness writing `commands` as one transaction.
    pub fn new(commands: Vec<Command>) -> Self {
        Self {
            commands,
            results: Vec::new(),
        }
    }

    /// Size of the transaction when written without a crash.
    pub fn transaction_len(&self) -> usize {
        crate::fixtures::write_commands(&self.commands).bytes_written()
    }

    /// Crashes after `crash_after` bytes and checks that the kernel panicked
    /// and that recovery returns exactly the commands written in full.
    pub fn crash_at(&mut self, crash_after: usize) -> CrashRecoveryResult {
        let description = format!("crash after {crash_after} bytes");
        let result = self
            .run_crash(crash_after)
            .unwrap_or_else(|e| CrashRecoveryResult::fail(&description, 0, 0, &e.to_string()));
        self.results.push(result.clone());
        result
    }

    /// Runs [`crash_at`](Self::crash_at) for every offset inside the
    /// transaction. Returns `true` if all passed.
    pub fn crash_everywhere(&mut self) -> bool {
        (0..self.transaction_len())
            .map(|offset| self.crash_at(offset).passed)
            .fold(true, |all, passed| all && passed)
    }

    fn run_crash(&self, crash_after: usize) -> Result<CrashRecoveryResult, CoreError> {
        let description = format!("crash after {crash_after} bytes");
        let channel = CrashableChannel::new(InMemoryLogChannel::new());
        channel.crash_after(crash_after);

        let health = Arc::new(KernelHealth::new());
        let log = TransactionLog::new(channel, Arc::clone(&health), LogConfig::default());
        let write = log.write_transaction(&self.commands);

        let crashed = log.with_channel(|c| c.has_crashed());
        if write.is_ok() || !crashed {
            return Ok(CrashRecoveryResult::fail(
                &description,
                0,
                0,
                "write completed without crashing",
            ));
        }
        if health.is_healthy() {
            return Ok(CrashRecoveryResult::fail(
                &description,
                0,
                0,
                "kernel still healthy after a failed write",
            ));
        }

        let surviving = log.with_channel(|c| c.inner().to_bytes());
        let expected = whole_commands_within(&self.commands, surviving.len());

        let mut replay = InMemoryLogChannel::with_data(&surviving);
        let mut recovered = Vec::new();
        recover(&mut replay, |_, cmd| {
            recovered.push(cmd);
            Ok(())
        })?;

        if recovered.as_slice() == &self.commands[..expected] {
            Ok(CrashRecoveryResult::pass(&description, expected))
        } else {
            Ok(CrashRecoveryResult::fail(
                &description,
                expected,
                recovered.len(),
                "recovered commands differ from the written prefix",
            ))
        }
    }
}

/// Number of leading commands whose encoding fits entirely in `len` bytes.
fn whole_commands_within(commands: &[Command], len: usize) -> usize {
    let mut end = 0;
    let mut count = 0;
    for command in commands {
        end += crate::fixtures::encode_command(command).len();
        if end > len {
            break;
        }
        count += 1;
    }
    count
}
