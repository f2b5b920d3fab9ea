//! Log file header.

use crate::error::{CoreError, CoreResult};
use graphlog_storage::{ReadableLogChannel, WritableLogChannel};

/// Current log format version.
pub const CURRENT_FORMAT_VERSION: u8 = 1;

/// Size of the encoded header in bytes.
pub const LOG_HEADER_SIZE: usize = 16;

const LOG_VERSION_BITS: u32 = 56;
const LOG_VERSION_MASK: u64 = (1 << LOG_VERSION_BITS) - 1;

/// Header at the start of every log file.
///
/// Layout (big-endian):
///
/// ```text
/// ┌──────────────────┬─────────────────────────┬──────────────────────┐
/// │ format version   │ log version             │ last committed tx    │
/// │ 1 byte           │ 7 bytes                 │ 8 bytes              │
/// └──────────────────┴─────────────────────────┴──────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHeader {
    /// Format version the file was written with.
    pub format_version: u8,
    /// Sequence number of this log file.
    pub log_version: u64,
    /// Last transaction committed before this file was started.
    pub last_committed_tx: u64,
}

impl LogHeader {
    /// Creates a header with the current format version.
    #[must_use]
    pub fn new(log_version: u64, last_committed_tx: u64) -> Self {
        Self {
            format_version: CURRENT_FORMAT_VERSION,
            log_version,
            last_committed_tx,
        }
    }

    /// Writes the header.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the log version needs more
    /// than 56 bits, or a channel error.
    #[allow(clippy::cast_possible_wrap)]
    pub fn write<C: WritableLogChannel + ?Sized>(&self, channel: &mut C) -> CoreResult<()> {
        if self.log_version > LOG_VERSION_MASK {
            return Err(CoreError::invalid_argument(format!(
                "log version {} does not fit the header",
                self.log_version
            )));
        }
        let packed = (u64::from(self.format_version) << LOG_VERSION_BITS) | self.log_version;
        channel
            .put_i64(packed as i64)?
            .put_i64(self.last_committed_tx as i64)?;
        Ok(())
    }

    /// Reads a header.
    ///
    /// Returns `Ok(None)` if the channel ends before a full header.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Corruption`] for an unsupported format version.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn read<C: ReadableLogChannel + ?Sized>(channel: &mut C) -> CoreResult<Option<Self>> {
        if channel.remaining()? < LOG_HEADER_SIZE as u64 {
            return Ok(None);
        }
        let packed = channel.get_i64()? as u64;
        let last_committed_tx = channel.get_i64()? as u64;

        let format_version = (packed >> LOG_VERSION_BITS) as u8;
        if format_version != CURRENT_FORMAT_VERSION {
            return Err(CoreError::corruption(format!(
                "unsupported log format version {format_version}"
            )));
        }

        Ok(Some(Self {
            format_version,
            log_version: packed & LOG_VERSION_MASK,
            last_committed_tx,
        }))
    }
}
