//! # graphlog storage
//!
//! Log channel traits and implementations for the graphlog transaction log.
//!
//! A log channel is a byte-oriented, primitive-typed append/read surface
//! over physical log storage. Channels have **no framing of their own**:
//! command encoding, tags and record layouts belong to `graphlog_core`.
//!
//! ## Design Principles
//!
//! - Writing and reading are separate capabilities
//!   ([`WritableLogChannel`], [`ReadableLogChannel`])
//! - A read that runs past the end fails with
//!   [`ChannelError::ReadPastEnd`] and never returns partial data
//! - Truncation is available only on concrete channel types, never through
//!   the traits
//! - All multi-byte values are big-endian
//!
//! ## Available Channels
//!
//! - [`InMemoryLogChannel`] - Growable buffer for tests and crash simulation
//! - [`FileLogChannel`] - Buffered, lock-protected physical log file
//!
//! ## Example
//!
//! ```rust
//! use graphlog_storage::{InMemoryLogChannel, ReadableLogChannel, WritableLogChannel};
//!
//! let mut channel = InMemoryLogChannel::new();
//! channel.put(1).unwrap().put_i64(13).unwrap();
//! assert_eq!(channel.get().unwrap(), 1);
//! assert_eq!(channel.get_i64().unwrap(), 13);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod channel;
mod error;
mod file;
mod memory;
mod position;

pub use channel::{ReadableLogChannel, WritableLogChannel};
pub use error::{ChannelError, ChannelResult};
pub use file::{FileChannelOptions, FileLogChannel, DEFAULT_READ_AHEAD, DEFAULT_ROTATION_THRESHOLD};
pub use memory::InMemoryLogChannel;
pub use position::LogPosition;
