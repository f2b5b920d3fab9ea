//! Store record snapshots carried by log commands.
//!
//! Each record is a plain value type holding the persisted fields of one
//! storage entity. Commands own their records; records are cloned, never
//! shared, and not modified once placed inside a command.
//!
//! Pointer fields use [`NO_ID`] for "no such record".

mod dynamic;
mod node;
mod property;
mod relationship;
mod schema;
mod token;

pub use dynamic::DynamicRecord;
pub use node::NodeRecord;
pub use property::{PropertyBlock, PropertyOwner, PropertyRecord};
pub use relationship::{RelationshipGroupRecord, RelationshipRecord};
pub use schema::{IndexProviderDescriptor, IndexRule, SchemaRule, UniquenessConstraintRule};
pub use token::{NeoStoreRecord, PropertyKeyTokenRecord, TokenRecord};

/// Sentinel for an absent record pointer.
pub const NO_ID: i64 = -1;
