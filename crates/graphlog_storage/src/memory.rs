//! In-memory log channel for testing.

use crate::channel::{ReadableLogChannel, WritableLogChannel};
use crate::error::{ChannelError, ChannelResult};
use crate::position::LogPosition;
use bytes::{BufMut, Bytes, BytesMut};

/// Initial buffer capacity. The buffer doubles as needed.
const INITIAL_CAPACITY: usize = 1024;

/// An in-memory log channel.
///
/// Implements both channel roles over one growable buffer with independent
/// read and write cursors. Suitable for:
/// - Unit and integration tests
/// - Crash simulation via [`truncate_to`](Self::truncate_to)
///
/// # Example
///
/// ```rust
/// use graphlog_storage::{InMemoryLogChannel, ReadableLogChannel, WritableLogChannel};
///
/// let mut channel = InMemoryLogChannel::new();
/// channel.put_i32(7).unwrap();
/// assert_eq!(channel.get_i32().unwrap(), 7);
/// assert!(!channel.has_more_data().unwrap());
/// ```
#[derive(Debug)]
pub struct InMemoryLogChannel {
    buffer: BytesMut,
    read_index: usize,
    log_version: u64,
    closed: bool,
}

impl Default for InMemoryLogChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLogChannel {
    /// Creates a new empty channel for log version 0.
    #[must_use]
    pub fn new() -> Self {
        Self::with_version(0)
    }

    /// Creates a new empty channel reporting the given log version.
    #[must_use]
    pub fn with_version(log_version: u64) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            read_index: 0,
            log_version,
            closed: false,
        }
    }

    /// Creates a channel preloaded with bytes, read cursor at the start.
    ///
    /// Useful for replaying captured logs.
    #[must_use]
    pub fn with_data(data: &[u8]) -> Self {
        let mut channel = Self::new();
        channel.buffer.put_slice(data);
        channel
    }

    /// Clears all bytes and resets both cursors.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.read_index = 0;
    }

    /// Moves the read cursor back to the first byte.
    pub fn rewind(&mut self) {
        self.read_index = 0;
    }

    /// Drops every byte at or after `len`, as if the process had stopped
    /// after writing exactly `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `len` exceeds the bytes written.
    pub fn truncate_to(&mut self, len: usize) -> ChannelResult<()> {
        if len > self.buffer.len() {
            return Err(ChannelError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "cannot truncate to {} bytes, only {} written",
                    len,
                    self.buffer.len()
                ),
            )));
        }
        self.buffer.truncate(len);
        self.read_index = self.read_index.min(len);
        Ok(())
    }

    /// Returns the number of bytes written.
    #[must_use]
    pub fn bytes_written(&self) -> usize {
        self.buffer.len()
    }

    /// Returns a snapshot of all written bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buffer)
    }

    fn ensure_open(&self) -> ChannelResult<()> {
        if self.closed {
            Err(ChannelError::Closed)
        } else {
            Ok(())
        }
    }
}

impl WritableLogChannel for InMemoryLogChannel {
    fn put_bytes(&mut self, bytes: &[u8]) -> ChannelResult<&mut Self> {
        self.ensure_open()?;
        self.buffer.put_slice(bytes);
        Ok(self)
    }

    fn force(&mut self) -> ChannelResult<()> {
        // Nothing is pending in memory
        self.ensure_open()
    }

    fn close(&mut self) -> ChannelResult<()> {
        self.closed = true;
        Ok(())
    }

    fn write_position(&self) -> LogPosition {
        LogPosition::new(self.log_version, self.buffer.len() as u64)
    }
}

impl ReadableLogChannel for InMemoryLogChannel {
    fn get_into(&mut self, dst: &mut [u8]) -> ChannelResult<()> {
        self.ensure_open()?;
        let available = self.buffer.len() - self.read_index;
        if dst.len() > available {
            return Err(ChannelError::ReadPastEnd {
                offset: self.read_index as u64,
                requested: dst.len(),
                available: available as u64,
            });
        }
        let end = self.read_index + dst.len();
        dst.copy_from_slice(&self.buffer[self.read_index..end]);
        self.read_index = end;
        Ok(())
    }

    fn remaining(&mut self) -> ChannelResult<u64> {
        self.ensure_open()?;
        Ok((self.buffer.len() - self.read_index) as u64)
    }

    fn current_position(&self) -> LogPosition {
        LogPosition::new(self.log_version, self.read_index as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let mut channel = InMemoryLogChannel::new();
        assert_eq!(channel.bytes_written(), 0);
        assert!(!channel.has_more_data().unwrap());
    }

    #[test]
    fn memory_primitives_read_back_in_order() {
        let mut channel = InMemoryLogChannel::new();
        channel
            .put(0xAB)
            .unwrap()
            .put_i16(-2)
            .unwrap()
            .put_i32(1 << 20)
            .unwrap()
            .put_i64(i64::MIN)
            .unwrap()
            .put_f32(1.5)
            .unwrap()
            .put_f64(-0.25)
            .unwrap();

        assert_eq!(channel.get().unwrap(), 0xAB);
        assert_eq!(channel.get_i16().unwrap(), -2);
        assert_eq!(channel.get_i32().unwrap(), 1 << 20);
        assert_eq!(channel.get_i64().unwrap(), i64::MIN);
        assert_eq!(channel.get_f32().unwrap(), 1.5);
        assert_eq!(channel.get_f64().unwrap(), -0.25);
        assert!(!channel.has_more_data().unwrap());
    }

    #[test]
    fn memory_writes_are_big_endian() {
        let mut channel = InMemoryLogChannel::new();
        channel.put_i32(0x0102_0304).unwrap();
        assert_eq!(&channel.to_bytes()[..], &[1, 2, 3, 4]);
    }

    #[test]
    fn memory_grows_past_initial_capacity() {
        let mut channel = InMemoryLogChannel::new();
        let payload = vec![7u8; INITIAL_CAPACITY * 3 + 5];
        channel.put(1).unwrap();
        channel.put_bytes(&payload).unwrap();

        assert_eq!(channel.bytes_written(), payload.len() + 1);
        assert_eq!(channel.get().unwrap(), 1);
        assert_eq!(channel.get_bytes(payload.len()).unwrap(), payload);
    }

    #[test]
    fn memory_chars_roundtrip() {
        let mut channel = InMemoryLogChannel::new();
        let text: Vec<u16> = "lucene+native".encode_utf16().collect();
        channel.put_chars(&text).unwrap();
        assert_eq!(channel.bytes_written(), text.len() * 2);
        assert_eq!(channel.get_chars(text.len()).unwrap(), text);
    }

    #[test]
    fn memory_read_past_end_consumes_nothing() {
        let mut channel = InMemoryLogChannel::new();
        channel.put_i16(5).unwrap();

        let result = channel.get_i32();
        assert!(matches!(result, Err(ChannelError::ReadPastEnd { .. })));
        assert_eq!(channel.current_position().byte_offset(), 0);
        assert_eq!(channel.get_i16().unwrap(), 5);
    }

    #[test]
    fn memory_huge_byte_read_fails_without_allocating() {
        let mut channel = InMemoryLogChannel::new();
        channel.put(1).unwrap();
        let err = channel.get_bytes(usize::MAX / 2).unwrap_err();
        assert!(err.is_read_past_end());
    }

    #[test]
    fn memory_truncate_hides_tail() {
        let mut channel = InMemoryLogChannel::new();
        channel.put_i64(99).unwrap();
        channel.truncate_to(7).unwrap();

        assert_eq!(channel.bytes_written(), 7);
        assert!(channel.get_i64().unwrap_err().is_read_past_end());
    }

    #[test]
    fn memory_truncate_beyond_written_fails() {
        let mut channel = InMemoryLogChannel::new();
        channel.put(1).unwrap();
        assert!(channel.truncate_to(2).is_err());
    }

    #[test]
    fn memory_positions_track_cursors() {
        let mut channel = InMemoryLogChannel::with_version(4);
        channel.put_i64(1).unwrap();
        assert_eq!(channel.write_position(), LogPosition::new(4, 8));
        assert_eq!(channel.current_position(), LogPosition::new(4, 0));
        channel.get_i32().unwrap();
        assert_eq!(channel.current_position(), LogPosition::new(4, 4));
    }

    #[test]
    fn memory_close_is_idempotent_and_final() {
        let mut channel = InMemoryLogChannel::new();
        channel.force().unwrap();
        channel.force().unwrap();
        channel.close().unwrap();
        channel.close().unwrap();

        assert!(matches!(channel.put(1), Err(ChannelError::Closed)));
        assert!(matches!(channel.force(), Err(ChannelError::Closed)));
        assert!(matches!(channel.get(), Err(ChannelError::Closed)));
    }

    #[test]
    fn memory_reset_clears_everything() {
        let mut channel = InMemoryLogChannel::new();
        channel.put_i32(3).unwrap();
        channel.get().unwrap();
        channel.reset();
        assert_eq!(channel.bytes_written(), 0);
        assert_eq!(channel.current_position().byte_offset(), 0);
    }

    proptest::proptest! {
        #[test]
        fn memory_short_reads_consume_nothing(
            data in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..64),
            request in 0usize..80,
        ) {
            let mut channel = InMemoryLogChannel::with_data(&data);
            match channel.get_bytes(request) {
                Ok(bytes) => {
                    proptest::prop_assert!(request <= data.len());
                    proptest::prop_assert_eq!(&bytes[..], &data[..request]);
                }
                Err(e) => {
                    proptest::prop_assert!(request > data.len());
                    proptest::prop_assert!(e.is_read_past_end());
                    proptest::prop_assert_eq!(channel.current_position().byte_offset(), 0);
                }
            }
        }
    }
}
