//! Log commands: before/after snapshots of store records.

use crate::record::{
    DynamicRecord, NeoStoreRecord, NodeRecord, PropertyKeyTokenRecord, PropertyRecord,
    RelationshipGroupRecord, RelationshipRecord, SchemaRule, TokenRecord,
};

/// Kind of a log command, persisted as the leading tag byte of every entry.
///
/// Tag values are part of the on-disk format and must never be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandKind {
    /// Node record change.
    Node = 1,
    /// Property record change.
    Property = 2,
    /// Relationship record change.
    Relationship = 3,
    /// Relationship type token change.
    RelationshipTypeToken = 4,
    /// Property key token change.
    PropertyKeyToken = 5,
    /// Store metadata change.
    NeoStore = 6,
    /// Schema rule change.
    SchemaRule = 7,
    /// Label token change.
    LabelToken = 8,
    /// Relationship group change.
    RelationshipGroup = 9,
}

impl CommandKind {
    /// Every command kind, in tag order.
    pub const ALL: [Self; 9] = [
        Self::Node,
        Self::Property,
        Self::Relationship,
        Self::RelationshipTypeToken,
        Self::PropertyKeyToken,
        Self::NeoStore,
        Self::SchemaRule,
        Self::LabelToken,
        Self::RelationshipGroup,
    ];

    /// Converts a tag byte to a command kind.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Node),
            2 => Some(Self::Property),
            3 => Some(Self::Relationship),
            4 => Some(Self::RelationshipTypeToken),
            5 => Some(Self::PropertyKeyToken),
            6 => Some(Self::NeoStore),
            7 => Some(Self::SchemaRule),
            8 => Some(Self::LabelToken),
            9 => Some(Self::RelationshipGroup),
            _ => None,
        }
    }

    /// Converts the command kind to its tag byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Human readable name, used by tooling.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Property => "property",
            Self::Relationship => "relationship",
            Self::RelationshipTypeToken => "relationship_type_token",
            Self::PropertyKeyToken => "property_key_token",
            Self::NeoStore => "neo_store",
            Self::SchemaRule => "schema_rule",
            Self::LabelToken => "label_token",
            Self::RelationshipGroup => "relationship_group",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single store change recorded in the transaction log.
///
/// Most kinds carry the record as it was before the change and as it is
/// after. A newly created record has an absent sentinel (`in_use == false`)
/// as its `before`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Node record change.
    Node {
        /// Record before the change.
        before: NodeRecord,
        /// Record after the change.
        after: NodeRecord,
    },
    /// Property record change.
    Property {
        /// Record before the change.
        before: PropertyRecord,
        /// Record after the change.
        after: PropertyRecord,
    },
    /// Relationship record change.
    Relationship {
        /// Record before the change.
        before: RelationshipRecord,
        /// Record after the change.
        after: RelationshipRecord,
    },
    /// Relationship type token change.
    RelationshipTypeToken {
        /// Record before the change.
        before: TokenRecord,
        /// Record after the change.
        after: TokenRecord,
    },
    /// Property key token change.
    PropertyKeyToken {
        /// Record before the change.
        before: PropertyKeyTokenRecord,
        /// Record after the change.
        after: PropertyKeyTokenRecord,
    },
    /// Store metadata change.
    NeoStore {
        /// Record before the change.
        before: NeoStoreRecord,
        /// Record after the change.
        after: NeoStoreRecord,
    },
    /// Schema rule change: the dynamic records storing the rule plus the
    /// decoded rule itself.
    SchemaRule {
        /// Schema store records before the change.
        before: Vec<DynamicRecord>,
        /// Schema store records after the change.
        after: Vec<DynamicRecord>,
        /// The rule being created, changed or dropped.
        rule: SchemaRule,
    },
    /// Label token change.
    LabelToken {
        /// Record before the change.
        before: TokenRecord,
        /// Record after the change.
        after: TokenRecord,
    },
    /// Relationship group change. Groups are logged as a single snapshot.
    RelationshipGroup {
        /// Record after the change.
        record: RelationshipGroupRecord,
    },
}

impl Command {
    /// Returns the kind of this command.
    #[must_use]
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Node { .. } => CommandKind::Node,
            Self::Property { .. } => CommandKind::Property,
            Self::Relationship { .. } => CommandKind::Relationship,
            Self::RelationshipTypeToken { .. } => CommandKind::RelationshipTypeToken,
            Self::PropertyKeyToken { .. } => CommandKind::PropertyKeyToken,
            Self::NeoStore { .. } => CommandKind::NeoStore,
            Self::SchemaRule { .. } => CommandKind::SchemaRule,
            Self::LabelToken { .. } => CommandKind::LabelToken,
            Self::RelationshipGroup { .. } => CommandKind::RelationshipGroup,
        }
    }

    /// Returns the id of the record this command changes.
    ///
    /// Store metadata has no id and reports `-1`.
    #[must_use]
    pub fn key(&self) -> i64 {
        match self {
            Self::Node { after, .. } => after.id,
            Self::Property { after, .. } => after.id,
            Self::Relationship { after, .. } => after.id,
            Self::RelationshipTypeToken { after, .. } | Self::LabelToken { after, .. } => {
                i64::from(after.id)
            }
            Self::PropertyKeyToken { after, .. } => i64::from(after.token.id),
            Self::NeoStore { .. } => crate::record::NO_ID,
            Self::SchemaRule { rule, .. } => rule.id(),
            Self::RelationshipGroup { record } => record.id,
        }
    }
}
