use super::DynamicRecord;

/// Snapshot of a label or relationship type token record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// Token id.
    pub id: i32,
    /// Whether the token exists.
    pub in_use: bool,
    /// First dynamic record of the token name.
    pub name_id: i32,
    /// Dynamic records holding the name.
    pub name_records: Vec<DynamicRecord>,
}

impl TokenRecord {
    /// Creates an unused token record with no name.
    #[must_use]
    pub fn new(id: i32) -> Self {
        Self {
            id,
            in_use: false,
            name_id: -1,
            name_records: Vec::new(),
        }
    }
}

/// Snapshot of a property key token record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyKeyTokenRecord {
    /// The token fields shared with other token kinds.
    pub token: TokenRecord,
    /// Number of properties using this key.
    pub property_count: i32,
}

impl PropertyKeyTokenRecord {
    /// Creates an unused property key token record.
    #[must_use]
    pub fn new(id: i32) -> Self {
        Self {
            token: TokenRecord::new(id),
            property_count: 0,
        }
    }
}

/// Snapshot of the store metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeoStoreRecord {
    /// First property record of graph-level properties.
    pub next_prop: i64,
}

impl Default for NeoStoreRecord {
    fn default() -> Self {
        Self {
            next_prop: super::NO_ID,
        }
    }
}
