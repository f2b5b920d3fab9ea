//! Log channel trait definitions.
//!
//! A log channel is split into two capability roles. Writers only ever see
//! [`WritableLogChannel`], recovery only ever sees [`ReadableLogChannel`].
//! Neither role can truncate: truncation is an inherent method on the
//! concrete channel types, reachable only by code that owns one.
//!
//! All multi-byte values are big-endian.

use crate::error::{ChannelError, ChannelResult};
use crate::position::LogPosition;

/// Append-only side of a log channel.
///
/// Every `put_*` method returns the channel itself so writes can be chained:
///
/// ```rust
/// use graphlog_storage::{InMemoryLogChannel, WritableLogChannel};
///
/// let mut channel = InMemoryLogChannel::new();
/// channel.put(1)?.put_i64(13)?.put_i32(-1)?;
/// assert_eq!(channel.bytes_written(), 13);
/// # Ok::<(), graphlog_storage::ChannelError>(())
/// ```
///
/// # Invariants
///
/// - Bytes are appended in call order and never lost when storage grows
/// - After `force` returns `Ok`, every previously appended byte is durable
/// - After `close`, every operation except `close` fails with
///   [`ChannelError::Closed`]
pub trait WritableLogChannel {
    /// Appends raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is closed or an I/O error occurs.
    fn put_bytes(&mut self, bytes: &[u8]) -> ChannelResult<&mut Self>;

    /// Makes all appended bytes durable.
    ///
    /// # Errors
    ///
    /// Returns an error if durability cannot be guaranteed.
    fn force(&mut self) -> ChannelResult<()>;

    /// Closes the channel, releasing the underlying resource.
    ///
    /// Closing an already closed channel is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if pending bytes cannot be written out.
    fn close(&mut self) -> ChannelResult<()>;

    /// Returns the position the next appended byte will occupy.
    fn write_position(&self) -> LogPosition;

    /// Appends a single byte.
    ///
    /// # Errors
    ///
    /// See [`put_bytes`](Self::put_bytes).
    fn put(&mut self, value: u8) -> ChannelResult<&mut Self> {
        self.put_bytes(&[value])
    }

    /// Appends a 16-bit integer.
    ///
    /// # Errors
    ///
    /// See [`put_bytes`](Self::put_bytes).
    fn put_i16(&mut self, value: i16) -> ChannelResult<&mut Self> {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Appends a 32-bit integer.
    ///
    /// # Errors
    ///
    /// See [`put_bytes`](Self::put_bytes).
    fn put_i32(&mut self, value: i32) -> ChannelResult<&mut Self> {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Appends a 64-bit integer.
    ///
    /// # Errors
    ///
    /// See [`put_bytes`](Self::put_bytes).
    fn put_i64(&mut self, value: i64) -> ChannelResult<&mut Self> {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Appends a 32-bit float.
    ///
    /// # Errors
    ///
    /// See [`put_bytes`](Self::put_bytes).
    fn put_f32(&mut self, value: f32) -> ChannelResult<&mut Self> {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Appends a 64-bit float.
    ///
    /// # Errors
    ///
    /// See [`put_bytes`](Self::put_bytes).
    fn put_f64(&mut self, value: f64) -> ChannelResult<&mut Self> {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Appends UTF-16 code units, two bytes each.
    ///
    /// The length is not written; callers that need it prefix it themselves.
    ///
    /// # Errors
    ///
    /// See [`put_bytes`](Self::put_bytes).
    fn put_chars(&mut self, chars: &[u16]) -> ChannelResult<&mut Self> {
        let mut encoded = Vec::with_capacity(chars.len() * 2);
        for ch in chars {
            encoded.extend_from_slice(&ch.to_be_bytes());
        }
        self.put_bytes(&encoded)
    }
}

/// Sequential read side of a log channel.
///
/// # Invariants
///
/// - A read that needs more bytes than [`remaining`](Self::remaining)
///   fails with [`ChannelError::ReadPastEnd`] and consumes nothing
/// - [`current_position`](Self::current_position) advances by exactly the
///   number of bytes consumed
pub trait ReadableLogChannel {
    /// Fills `dst` completely from the current read position.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::ReadPastEnd`] if fewer than `dst.len()` bytes
    /// remain, [`ChannelError::Closed`] after close, or an I/O error.
    fn get_into(&mut self, dst: &mut [u8]) -> ChannelResult<()>;

    /// Returns the number of unread bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is closed.
    fn remaining(&mut self) -> ChannelResult<u64>;

    /// Returns the position of the next byte to be read.
    fn current_position(&self) -> LogPosition;

    /// Returns `true` if at least one unread byte remains.
    ///
    /// # Errors
    ///
    /// See [`remaining`](Self::remaining).
    fn has_more_data(&mut self) -> ChannelResult<bool> {
        Ok(self.remaining()? > 0)
    }

    /// Reads a single byte.
    ///
    /// # Errors
    ///
    /// See [`get_into`](Self::get_into).
    fn get(&mut self) -> ChannelResult<u8> {
        let mut buf = [0u8; 1];
        self.get_into(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads a 16-bit integer.
    ///
    /// # Errors
    ///
    /// See [`get_into`](Self::get_into).
    fn get_i16(&mut self) -> ChannelResult<i16> {
        let mut buf = [0u8; 2];
        self.get_into(&mut buf)?;
        Ok(i16::from_be_bytes(buf))
    }

    /// Reads a 32-bit integer.
    ///
    /// # Errors
    ///
    /// See [`get_into`](Self::get_into).
    fn get_i32(&mut self) -> ChannelResult<i32> {
        let mut buf = [0u8; 4];
        self.get_into(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    /// Reads a 64-bit integer.
    ///
    /// # Errors
    ///
    /// See [`get_into`](Self::get_into).
    fn get_i64(&mut self) -> ChannelResult<i64> {
        let mut buf = [0u8; 8];
        self.get_into(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }

    /// Reads a 32-bit float.
    ///
    /// # Errors
    ///
    /// See [`get_into`](Self::get_into).
    fn get_f32(&mut self) -> ChannelResult<f32> {
        let mut buf = [0u8; 4];
        self.get_into(&mut buf)?;
        Ok(f32::from_be_bytes(buf))
    }

    /// Reads a 64-bit float.
    ///
    /// # Errors
    ///
    /// See [`get_into`](Self::get_into).
    fn get_f64(&mut self) -> ChannelResult<f64> {
        let mut buf = [0u8; 8];
        self.get_into(&mut buf)?;
        Ok(f64::from_be_bytes(buf))
    }

    /// Reads `len` raw bytes.
    ///
    /// The length is checked against the remaining bytes before anything is
    /// allocated, so a torn length prefix cannot trigger a huge allocation.
    ///
    /// # Errors
    ///
    /// See [`get_into`](Self::get_into).
    fn get_bytes(&mut self, len: usize) -> ChannelResult<Vec<u8>> {
        let available = self.remaining()?;
        if len as u64 > available {
            return Err(ChannelError::ReadPastEnd {
                offset: self.current_position().byte_offset(),
                requested: len,
                available,
            });
        }
        let mut buf = vec![0u8; len];
        self.get_into(&mut buf)?;
        Ok(buf)
    }

    /// Reads `len` UTF-16 code units.
    ///
    /// # Errors
    ///
    /// See [`get_into`](Self::get_into).
    fn get_chars(&mut self, len: usize) -> ChannelResult<Vec<u16>> {
        let bytes = self.get_bytes(len.saturating_mul(2))?;
        Ok(bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect())
    }
}
