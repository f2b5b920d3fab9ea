use super::{DynamicRecord, NO_ID};

/// The entity a property record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertyOwner {
    /// Not yet attached (or detached on delete).
    #[default]
    None,
    /// Owned by a node.
    Node(i64),
    /// Owned by a relationship.
    Relationship(i64),
}

/// One property value inside a property record.
///
/// Short values are packed into `value_blocks`; long strings and arrays
/// spill into an ordered chain of dynamic `value_records`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyBlock {
    /// Packed header and inline value words.
    pub value_blocks: Vec<i64>,
    /// Dynamic records holding the spilled value, in chain order.
    pub value_records: Vec<DynamicRecord>,
}

impl PropertyBlock {
    /// Creates a block whose value fits inline.
    #[must_use]
    pub fn inline(value_blocks: Vec<i64>) -> Self {
        Self {
            value_blocks,
            value_records: Vec::new(),
        }
    }
}

/// Snapshot of a property record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRecord {
    /// Property record id.
    pub id: i64,
    /// Whether the record is in use.
    pub in_use: bool,
    /// Previous record in the owner's property chain.
    pub prev_prop: i64,
    /// Next record in the owner's property chain.
    pub next_prop: i64,
    /// Owning entity.
    pub owner: PropertyOwner,
    /// Property values stored in this record.
    pub blocks: Vec<PropertyBlock>,
    /// Dynamic records freed by this change.
    pub deleted_records: Vec<DynamicRecord>,
}

impl PropertyRecord {
    /// Creates an unused, empty property record.
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            id,
            in_use: false,
            prev_prop: NO_ID,
            next_prop: NO_ID,
            owner: PropertyOwner::None,
            blocks: Vec::new(),
            deleted_records: Vec::new(),
        }
    }

    /// Creates an empty property record owned by `owner`.
    #[must_use]
    pub fn owned_by(id: i64, owner: PropertyOwner) -> Self {
        Self {
            owner,
            ..Self::new(id)
        }
    }
}
