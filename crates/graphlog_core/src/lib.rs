//! # graphlog core
//!
//! Transaction log commands, codec and kernel health for a graph store.
//!
//! This crate provides:
//! - Store record snapshots and the [`Command`] model with stable tags
//! - [`CommandWriter`] / [`CommandReader`], a byte-exact codec over the
//!   channels of `graphlog_storage`
//! - Recovery that replays complete commands and stops at a torn tail
//! - [`TransactionLog`], which serializes writers and panics the kernel
//!   when the log fails
//! - [`KernelHealth`] and ordered [`KernelEventHandlers`]
//!
//! ## Example
//!
//! ```rust
//! use graphlog_core::{Command, CommandReader, CommandWriter, NodeRecord};
//! use graphlog_storage::InMemoryLogChannel;
//!
//! let mut channel = InMemoryLogChannel::new();
//! let cmd = Command::Node {
//!     before: NodeRecord::new(12),
//!     after: NodeRecord::in_use(12, false, 13, 13),
//! };
//! CommandWriter::write_command_entry(&mut channel, &cmd).unwrap();
//!
//! assert_eq!(CommandReader::read(&mut channel).unwrap(), Some(cmd));
//! assert_eq!(CommandReader::read(&mut channel).unwrap(), None);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod config;
mod error;
mod kernel;
mod log;
mod record;

pub use command::{Command, CommandKind};
pub use config::{LogConfig, FORCE_ON_WRITE_SETTING, READ_AHEAD_SETTING, ROTATION_THRESHOLD_SETTING};
pub use error::{CoreError, CoreResult};
pub use kernel::{
    ErrorState, ExecutionOrder, KernelEventHandler, KernelEventHandlers, KernelHealth, PanicCause,
};
pub use log::{
    open_log_file, read_log_header, recover, repair_torn_tail, CommandIterator, CommandReader,
    CommandWriter, LogHeader, RecoveryOutcome, TransactionLog, CURRENT_FORMAT_VERSION,
    LOG_HEADER_SIZE,
};
pub use record::{
    DynamicRecord, IndexProviderDescriptor, IndexRule, NeoStoreRecord, NodeRecord, PropertyBlock,
    PropertyKeyTokenRecord, PropertyOwner, PropertyRecord, RelationshipGroupRecord,
    RelationshipRecord, SchemaRule, TokenRecord, UniquenessConstraintRule, NO_ID,
};

/// Crate version, reported by tooling.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
