//! File-backed log channel for persistent logs.

use crate::channel::{ReadableLogChannel, WritableLogChannel};
use crate::error::{ChannelError, ChannelResult};
use crate::position::LogPosition;
use bytes::BytesMut;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Appended bytes are written through to the file once this many are pending.
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Default read-ahead buffer size.
pub const DEFAULT_READ_AHEAD: usize = 64 * 1024;

/// Default size at which a log file asks to be rotated.
pub const DEFAULT_ROTATION_THRESHOLD: u64 = 25 * 1024 * 1024;

/// Construction parameters for a [`FileLogChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileChannelOptions {
    /// Version number of the log file, reported in positions.
    pub log_version: u64,
    /// Size of the read-ahead buffer.
    pub read_ahead: usize,
    /// Size in bytes at which [`FileLogChannel::needs_rotation`] turns true.
    pub rotation_threshold: u64,
}

impl Default for FileChannelOptions {
    fn default() -> Self {
        Self {
            log_version: 0,
            read_ahead: DEFAULT_READ_AHEAD,
            rotation_threshold: DEFAULT_ROTATION_THRESHOLD,
        }
    }
}

/// A log channel over one physical log file.
///
/// Appends are buffered in memory and written through when the buffer fills
/// or on [`force`](WritableLogChannel::force), which also syncs the file.
/// Reads start at offset 0 and use a read-ahead buffer; they observe every
/// byte appended through this channel, forced or not.
///
/// The file is locked exclusively while the channel is open, so two kernels
/// can never append to the same log.
///
/// # Example
///
/// ```no_run
/// use graphlog_storage::{FileLogChannel, WritableLogChannel};
/// use std::path::Path;
///
/// let mut channel = FileLogChannel::open(Path::new("graph.log.0")).unwrap();
/// channel.put(1).unwrap().put_i64(42).unwrap();
/// channel.force().unwrap(); // durable from here on
/// ```
#[derive(Debug)]
pub struct FileLogChannel {
    path: PathBuf,
    file: Option<File>,
    options: FileChannelOptions,
    /// Bytes appended but not yet written to the file.
    pending: BytesMut,
    /// Bytes present in the file.
    file_size: u64,
    read_offset: u64,
    read_buffer: Vec<u8>,
    read_buffer_start: u64,
    read_buffer_len: usize,
}

impl FileLogChannel {
    /// Opens or creates the log file at `path` with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is locked.
    pub fn open(path: &Path) -> ChannelResult<Self> {
        Self::open_with(path, FileChannelOptions::default())
    }

    /// Opens or creates the log file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, or
    /// [`ChannelError::Locked`] if another channel holds it.
    pub fn open_with(path: &Path, options: FileChannelOptions) -> ChannelResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(ChannelError::Locked(path.display().to_string()));
        }

        let file_size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            options,
            pending: BytesMut::with_capacity(WRITE_BUFFER_SIZE),
            file_size,
            read_offset: 0,
            read_buffer: vec![0u8; options.read_ahead.max(1)],
            read_buffer_start: 0,
            read_buffer_len: 0,
        })
    }

    /// Returns the path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the log version this file holds.
    #[must_use]
    pub fn log_version(&self) -> u64 {
        self.options.log_version
    }

    /// Returns the total size, including bytes not yet written through.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.file_size + self.pending.len() as u64
    }

    /// Returns `true` once the log has reached its rotation threshold.
    #[must_use]
    pub fn needs_rotation(&self) -> bool {
        self.size() >= self.options.rotation_threshold
    }

    /// Cuts the log file back to `len` bytes and syncs it.
    ///
    /// This is the repair step after recovery found a torn tail. It is not
    /// part of either channel trait.
    ///
    /// # Errors
    ///
    /// Returns an error if `len` exceeds the log size or the file cannot be
    /// truncated.
    pub fn truncate_to(&mut self, len: u64) -> ChannelResult<()> {
        self.write_pending()?;
        if len > self.file_size {
            return Err(ChannelError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "cannot truncate to {} bytes, log holds {}",
                    len, self.file_size
                ),
            )));
        }

        let file = self.file_mut()?;
        file.set_len(len)?;
        file.sync_all()?;

        self.file_size = len;
        self.read_offset = self.read_offset.min(len);
        self.read_buffer_len = 0;
        Ok(())
    }

    fn file_mut(&mut self) -> ChannelResult<&mut File> {
        self.file.as_mut().ok_or(ChannelError::Closed)
    }

    fn write_pending(&mut self) -> ChannelResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let file = self.file.as_mut().ok_or(ChannelError::Closed)?;
        file.seek(SeekFrom::End(0))?;
        file.write_all(&self.pending)?;
        self.file_size += self.pending.len() as u64;
        self.pending.clear();
        Ok(())
    }

    /// Makes `[offset, offset + len)` available in the read buffer.
    fn fill_read_buffer(&mut self, offset: u64, len: usize) -> ChannelResult<()> {
        let buffered_end = self.read_buffer_start + self.read_buffer_len as u64;
        if offset >= self.read_buffer_start && offset + len as u64 <= buffered_end {
            return Ok(());
        }

        if len > self.read_buffer.len() {
            self.read_buffer.resize(len.next_power_of_two(), 0);
        }
        let to_read = (self.read_buffer.len() as u64).min(self.file_size - offset) as usize;

        let file = self.file.as_mut().ok_or(ChannelError::Closed)?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut self.read_buffer[..to_read])?;

        self.read_buffer_start = offset;
        self.read_buffer_len = to_read;
        Ok(())
    }
}

impl WritableLogChannel for FileLogChannel {
    fn put_bytes(&mut self, bytes: &[u8]) -> ChannelResult<&mut Self> {
        if self.file.is_none() {
            return Err(ChannelError::Closed);
        }
        self.pending.extend_from_slice(bytes);
        if self.pending.len() >= WRITE_BUFFER_SIZE {
            self.write_pending()?;
        }
        Ok(self)
    }

    fn force(&mut self) -> ChannelResult<()> {
        self.write_pending()?;
        let file = self.file_mut()?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }

    fn close(&mut self) -> ChannelResult<()> {
        if self.file.is_none() {
            return Ok(());
        }
        self.force()?;
        // Dropping the handle releases the lock
        self.file = None;
        Ok(())
    }

    fn write_position(&self) -> LogPosition {
        LogPosition::new(self.options.log_version, self.size())
    }
}

impl ReadableLogChannel for FileLogChannel {
    fn get_into(&mut self, dst: &mut [u8]) -> ChannelResult<()> {
        let available = self.remaining()?;
        if dst.len() as u64 > available {
            return Err(ChannelError::ReadPastEnd {
                offset: self.read_offset,
                requested: dst.len(),
                available,
            });
        }
        if dst.is_empty() {
            return Ok(());
        }

        self.write_pending()?;
        self.fill_read_buffer(self.read_offset, dst.len())?;

        let start = (self.read_offset - self.read_buffer_start) as usize;
        dst.copy_from_slice(&self.read_buffer[start..start + dst.len()]);
        self.read_offset += dst.len() as u64;
        Ok(())
    }

    fn remaining(&mut self) -> ChannelResult<u64> {
        if self.file.is_none() {
            return Err(ChannelError::Closed);
        }
        Ok(self.size() - self.read_offset)
    }

    fn current_position(&self) -> LogPosition {
        LogPosition::new(self.options.log_version, self.read_offset)
    }
}

impl Drop for FileLogChannel {
    fn drop(&mut self) {
        // Best effort: bytes never forced carry no durability promise
        let _ = self.write_pending();
    }
}
