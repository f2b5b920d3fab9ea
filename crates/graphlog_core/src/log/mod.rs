//! Transaction log codec, recovery and the kernel-facing log.
//!
//! This module implements:
//! - Command entry serialization ([`CommandWriter`]) and deserialization
//!   ([`CommandReader`])
//! - Streaming iteration and recovery that stop cleanly at a torn tail
//! - The log file header and file-level open/repair helpers
//! - [`TransactionLog`], the single serialized append point
//!
//! ## Entry Format
//!
//! ```text
//! ┌─────────┬──────────────────────────────────────────────┐
//! │ tag: u8 │ before/after record fields (big-endian)      │
//! └─────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Entries carry no length prefix and no checksum. A reader that runs out
//! of bytes part way through an entry reports "incomplete", never an error.

mod file;
mod format;
mod header;
mod iterator;
mod reader;
mod transaction_log;
mod writer;

pub use file::{open_log_file, read_log_header, repair_torn_tail};
pub use header::{LogHeader, CURRENT_FORMAT_VERSION, LOG_HEADER_SIZE};
pub use iterator::{recover, CommandIterator, RecoveryOutcome};
pub use reader::CommandReader;
pub use transaction_log::TransactionLog;
pub use writer::CommandWriter;
