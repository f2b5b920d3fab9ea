//! Log position tokens.

use std::fmt;

/// A position within the transaction log.
///
/// Positions order first by log version (which physical log file) and then
/// by byte offset within that file. They are opaque to the codec: it only
/// records and compares them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LogPosition {
    log_version: u64,
    byte_offset: u64,
}

impl LogPosition {
    /// The position of the first byte of log version 0.
    pub const START: Self = Self::new(0, 0);

    /// Creates a new position.
    #[must_use]
    pub const fn new(log_version: u64, byte_offset: u64) -> Self {
        Self {
            log_version,
            byte_offset,
        }
    }

    /// Returns the log version.
    #[must_use]
    pub const fn log_version(self) -> u64 {
        self.log_version
    }

    /// Returns the byte offset within the log version.
    #[must_use]
    pub const fn byte_offset(self) -> u64 {
        self.byte_offset
    }
}

impl fmt::Display for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log:{}@{}", self.log_version, self.byte_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_order_by_version_then_offset() {
        let a = LogPosition::new(1, 500);
        let b = LogPosition::new(2, 0);
        let c = LogPosition::new(2, 16);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn position_display() {
        assert_eq!(LogPosition::new(3, 42).to_string(), "log:3@42");
    }
}
