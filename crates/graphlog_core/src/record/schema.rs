//! Schema rule descriptors.

/// Identifies the index provider implementation backing an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexProviderDescriptor {
    /// Provider key, e.g. `"lucene"`.
    pub key: String,
    /// Provider version, e.g. `"1.0"`.
    pub version: String,
}

impl IndexProviderDescriptor {
    /// Creates a descriptor.
    pub fn new(key: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version: version.into(),
        }
    }
}

/// An index over one property of one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRule {
    /// Rule id.
    pub id: i64,
    /// Label token id the index covers.
    pub label: i32,
    /// Property key token id the index covers.
    pub property_key: i32,
    /// Provider backing the index.
    pub provider: IndexProviderDescriptor,
    /// Constraint rule that owns this index, for constraint indexes.
    pub owning_constraint: Option<i64>,
}

/// A uniqueness constraint over one property of one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniquenessConstraintRule {
    /// Rule id.
    pub id: i64,
    /// Label token id.
    pub label: i32,
    /// Property key token id.
    pub property_key: i32,
    /// Index rule enforcing the constraint.
    pub owned_index: i64,
}

/// A schema rule carried by a schema rule command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaRule {
    /// An index, possibly owned by a constraint.
    Index(IndexRule),
    /// A uniqueness constraint.
    UniquenessConstraint(UniquenessConstraintRule),
}

impl SchemaRule {
    /// Returns the rule id.
    #[must_use]
    pub fn id(&self) -> i64 {
        match self {
            Self::Index(rule) => rule.id,
            Self::UniquenessConstraint(rule) => rule.id,
        }
    }

    /// Returns the label the rule applies to.
    #[must_use]
    pub fn label(&self) -> i32 {
        match self {
            Self::Index(rule) => rule.label,
            Self::UniquenessConstraint(rule) => rule.label,
        }
    }

    /// Returns the property key the rule applies to.
    #[must_use]
    pub fn property_key(&self) -> i32 {
        match self {
            Self::Index(rule) => rule.property_key,
            Self::UniquenessConstraint(rule) => rule.property_key,
        }
    }
}
