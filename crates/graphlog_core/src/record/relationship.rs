use super::NO_ID;

/// Snapshot of a relationship record.
///
/// A relationship sits in two doubly linked chains, one per end node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipRecord {
    /// Relationship id.
    pub id: i64,
    /// Whether the relationship exists.
    pub in_use: bool,
    /// Start node.
    pub first_node: i64,
    /// End node.
    pub second_node: i64,
    /// Relationship type token id.
    pub rel_type: i32,
    /// Previous relationship in the start node's chain.
    pub first_prev_rel: i64,
    /// Next relationship in the start node's chain.
    pub first_next_rel: i64,
    /// Previous relationship in the end node's chain.
    pub second_prev_rel: i64,
    /// Next relationship in the end node's chain.
    pub second_next_rel: i64,
    /// First property record, or [`NO_ID`].
    pub next_prop: i64,
    /// Whether this is the head of the start node's chain.
    pub first_in_first_chain: bool,
    /// Whether this is the head of the end node's chain.
    pub first_in_second_chain: bool,
}

impl RelationshipRecord {
    /// Creates an unused relationship between two nodes with empty chains.
    #[must_use]
    pub fn new(id: i64, first_node: i64, second_node: i64, rel_type: i32) -> Self {
        Self {
            id,
            in_use: false,
            first_node,
            second_node,
            rel_type,
            first_prev_rel: NO_ID,
            first_next_rel: NO_ID,
            second_prev_rel: NO_ID,
            second_next_rel: NO_ID,
            next_prop: NO_ID,
            first_in_first_chain: true,
            first_in_second_chain: true,
        }
    }
}

/// Snapshot of a relationship group record.
///
/// Dense nodes keep one group per relationship type, each pointing at the
/// outgoing, incoming and loop chains of that type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipGroupRecord {
    /// Group id.
    pub id: i64,
    /// Whether the group exists.
    pub in_use: bool,
    /// Relationship type token id.
    pub rel_type: i32,
    /// Next group of the same node.
    pub next: i64,
    /// First outgoing relationship.
    pub first_out: i64,
    /// First incoming relationship.
    pub first_in: i64,
    /// First loop relationship.
    pub first_loop: i64,
    /// Node owning this group.
    pub owning_node: i64,
}

impl RelationshipGroupRecord {
    /// Creates an unused group for `rel_type` with empty chains.
    #[must_use]
    pub fn new(id: i64, rel_type: i32) -> Self {
        Self {
            id,
            in_use: false,
            rel_type,
            next: NO_ID,
            first_out: NO_ID,
            first_in: NO_ID,
            first_loop: NO_ID,
            owning_node: NO_ID,
        }
    }
}
