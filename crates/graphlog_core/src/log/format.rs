//! Flag bits and discriminators shared by the command writer and reader.

/// Record is in use.
pub(crate) const IN_USE: u8 = 0b0000_0001;
/// Node relationships are grouped.
pub(crate) const NODE_DENSE: u8 = 0b0000_0010;
/// Relationship heads its start node's chain.
pub(crate) const REL_FIRST_IN_FIRST_CHAIN: u8 = 0b0000_0010;
/// Relationship heads its end node's chain.
pub(crate) const REL_FIRST_IN_SECOND_CHAIN: u8 = 0b0000_0100;

pub(crate) const DYNAMIC_IN_USE: u8 = 0b0000_0001;
pub(crate) const DYNAMIC_START_RECORD: u8 = 0b0000_0010;

pub(crate) const NODE_FLAGS: u8 = IN_USE | NODE_DENSE;
pub(crate) const RELATIONSHIP_FLAGS: u8 = IN_USE | REL_FIRST_IN_FIRST_CHAIN | REL_FIRST_IN_SECOND_CHAIN;
pub(crate) const DYNAMIC_FLAGS: u8 = DYNAMIC_IN_USE | DYNAMIC_START_RECORD;

pub(crate) const OWNER_NONE: u8 = 0;
pub(crate) const OWNER_NODE: u8 = 1;
pub(crate) const OWNER_RELATIONSHIP: u8 = 2;

pub(crate) const SCHEMA_INDEX: u8 = 1;
pub(crate) const SCHEMA_CONSTRAINT_INDEX: u8 = 2;
pub(crate) const SCHEMA_UNIQUENESS_CONSTRAINT: u8 = 3;
