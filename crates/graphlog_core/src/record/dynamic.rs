//! Dynamic records: chained blocks holding long strings, arrays, label
//! lists and serialized schema rules.

use super::NO_ID;

/// One block of a dynamic record chain.
///
/// The payload is opaque to the log; only its length is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicRecord {
    /// Record id.
    pub id: i64,
    /// Whether the record is in use.
    pub in_use: bool,
    /// Whether this block starts a chain.
    pub start_record: bool,
    /// Next block in the chain, or [`NO_ID`].
    pub next_block: i64,
    /// Store-specific type marker of the payload.
    pub record_type: i32,
    /// Opaque payload bytes.
    pub data: Vec<u8>,
}

impl DynamicRecord {
    /// Creates an unused, empty record.
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            id,
            in_use: false,
            start_record: true,
            next_block: NO_ID,
            record_type: 0,
            data: Vec::new(),
        }
    }

    /// Creates a fully specified record.
    #[must_use]
    pub fn with_data(
        id: i64,
        in_use: bool,
        start_record: bool,
        next_block: i64,
        record_type: i32,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id,
            in_use,
            start_record,
            next_block,
            record_type,
            data: data.into(),
        }
    }

    /// Returns the payload length in bytes.
    #[must_use]
    pub fn length(&self) -> usize {
        self.data.len()
    }
}
