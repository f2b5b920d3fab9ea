use super::{DynamicRecord, NO_ID};

/// Snapshot of a node record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// Node id.
    pub id: i64,
    /// Whether the node exists.
    pub in_use: bool,
    /// Whether relationships are partitioned into relationship groups.
    pub dense: bool,
    /// First relationship (or group, when dense), or [`NO_ID`].
    pub next_rel: i64,
    /// First property record, or [`NO_ID`].
    pub next_prop: i64,
    /// Inlined label ids, or a pointer to dynamic label records.
    pub label_field: i64,
    /// Label records used when the labels do not fit inline.
    pub dynamic_label_records: Vec<DynamicRecord>,
}

impl NodeRecord {
    /// Creates the absent sentinel for node `id`: not in use, no pointers.
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            id,
            in_use: false,
            dense: false,
            next_rel: NO_ID,
            next_prop: NO_ID,
            label_field: 0,
            dynamic_label_records: Vec::new(),
        }
    }

    /// Creates an in-use node with the given chains.
    #[must_use]
    pub fn in_use(id: i64, dense: bool, next_rel: i64, next_prop: i64) -> Self {
        Self {
            id,
            in_use: true,
            dense,
            next_rel,
            next_prop,
            label_field: 0,
            dynamic_label_records: Vec::new(),
        }
    }
}
