//! Property-based test generators using proptest.
//!
//! Provides strategies for generating records and commands of every kind.
//! Generated values are structurally valid: anything they produce can be
//! written and must read back unchanged.

use graphlog_core::{
    Command, DynamicRecord, IndexProviderDescriptor, IndexRule, NeoStoreRecord, NodeRecord,
    PropertyBlock, PropertyKeyTokenRecord, PropertyOwner, PropertyRecord, RelationshipGroupRecord,
    RelationshipRecord, SchemaRule, TokenRecord, UniquenessConstraintRule,
};
use proptest::prelude::*;

/// Strategy for record ids, biased towards small ids and the absent sentinel.
pub fn record_id_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![
        4 => 0i64..1_000,
        1 => Just(-1i64),
        1 => any::<i64>(),
    ]
}

/// Strategy for dynamic records with short payloads.
pub fn dynamic_record_strategy() -> impl Strategy<Value = DynamicRecord> {
    (
        record_id_strategy(),
        any::<bool>(),
        any::<bool>(),
        record_id_strategy(),
        any::<i32>(),
        prop::collection::vec(any::<u8>(), 0..48),
    )
        .prop_map(|(id, in_use, start_record, next_block, record_type, data)| {
            DynamicRecord::with_data(id, in_use, start_record, next_block, record_type, data)
        })
}

/// Strategy for short dynamic record chains.
pub fn dynamic_records_strategy() -> impl Strategy<Value = Vec<DynamicRecord>> {
    prop::collection::vec(dynamic_record_strategy(), 0..3)
}

/// Strategy for node records.
pub fn node_record_strategy() -> impl Strategy<Value = NodeRecord> {
    (
        record_id_strategy(),
        any::<bool>(),
        any::<bool>(),
        record_id_strategy(),
        record_id_strategy(),
        any::<i64>(),
        dynamic_records_strategy(),
    )
        .prop_map(
            |(id, in_use, dense, next_rel, next_prop, label_field, dynamic_label_records)| {
                NodeRecord {
                    id,
                    in_use,
                    dense,
                    next_rel,
                    next_prop,
                    label_field,
                    dynamic_label_records,
                }
            },
        )
}

/// Strategy for relationship records.
pub fn relationship_record_strategy() -> impl Strategy<Value = RelationshipRecord> {
    (
        (record_id_strategy(), any::<bool>(), record_id_strategy(), record_id_strategy()),
        any::<i32>(),
        (
            record_id_strategy(),
            record_id_strategy(),
            record_id_strategy(),
            record_id_strategy(),
        ),
        record_id_strategy(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |(
                (id, in_use, first_node, second_node),
                rel_type,
                (first_prev_rel, first_next_rel, second_prev_rel, second_next_rel),
                next_prop,
                first_in_first_chain,
                first_in_second_chain,
            )| RelationshipRecord {
                id,
                in_use,
                first_node,
                second_node,
                rel_type,
                first_prev_rel,
                first_next_rel,
                second_prev_rel,
                second_next_rel,
                next_prop,
                first_in_first_chain,
                first_in_second_chain,
            },
        )
}

/// Strategy for relationship group records.
pub fn relationship_group_strategy() -> impl Strategy<Value = RelationshipGroupRecord> {
    (
        record_id_strategy(),
        any::<bool>(),
        any::<i32>(),
        record_id_strategy(),
        record_id_strategy(),
        record_id_strategy(),
        record_id_strategy(),
        record_id_strategy(),
    )
        .prop_map(
            |(id, in_use, rel_type, next, first_out, first_in, first_loop, owning_node)| {
                RelationshipGroupRecord {
                    id,
                    in_use,
                    rel_type,
                    next,
                    first_out,
                    first_in,
                    first_loop,
                    owning_node,
                }
            },
        )
}

/// Strategy for property owners.
pub fn property_owner_strategy() -> impl Strategy<Value = PropertyOwner> {
    prop_oneof![
        Just(PropertyOwner::None),
        record_id_strategy().prop_map(PropertyOwner::Node),
        record_id_strategy().prop_map(PropertyOwner::Relationship),
    ]
}

/// Strategy for property blocks.
pub fn property_block_strategy() -> impl Strategy<Value = PropertyBlock> {
    (
        prop::collection::vec(any::<i64>(), 1..4),
        dynamic_records_strategy(),
    )
        .prop_map(|(value_blocks, value_records)| PropertyBlock {
            value_blocks,
            value_records,
        })
}

/// Strategy for property records.
pub fn property_record_strategy() -> impl Strategy<Value = PropertyRecord> {
    (
        record_id_strategy(),
        any::<bool>(),
        record_id_strategy(),
        record_id_strategy(),
        property_owner_strategy(),
        prop::collection::vec(property_block_strategy(), 0..4),
        dynamic_records_strategy(),
    )
        .prop_map(
            |(id, in_use, prev_prop, next_prop, owner, blocks, deleted_records)| PropertyRecord {
                id,
                in_use,
                prev_prop,
                next_prop,
                owner,
                blocks,
                deleted_records,
            },
        )
}

/// Strategy for label and relationship type token records.
pub fn token_record_strategy() -> impl Strategy<Value = TokenRecord> {
    (
        0i32..10_000,
        any::<bool>(),
        -1i32..10_000,
        dynamic_records_strategy(),
    )
        .prop_map(|(id, in_use, name_id, name_records)| TokenRecord {
            id,
            in_use,
            name_id,
            name_records,
        })
}

/// Strategy for property key token records.
pub fn property_key_token_strategy() -> impl Strategy<Value = PropertyKeyTokenRecord> {
    (token_record_strategy(), 0i32..1_000_000).prop_map(|(token, property_count)| {
        PropertyKeyTokenRecord {
            token,
            property_count,
        }
    })
}

/// Strategy for schema rules, including non-ASCII provider names.
pub fn schema_rule_strategy() -> impl Strategy<Value = SchemaRule> {
    let name = "[a-zA-Z0-9._\\-éß漢]{0,12}";
    prop_oneof![
        (
            record_id_strategy(),
            any::<i32>(),
            any::<i32>(),
            name,
            name,
            prop::option::of(record_id_strategy()),
        )
            .prop_map(|(id, label, property_key, key, version, owning_constraint)| {
                SchemaRule::Index(IndexRule {
                    id,
                    label,
                    property_key,
                    provider: IndexProviderDescriptor { key, version },
                    owning_constraint,
                })
            }),
        (
            record_id_strategy(),
            any::<i32>(),
            any::<i32>(),
            record_id_strategy(),
        )
            .prop_map(|(id, label, property_key, owned_index)| {
                SchemaRule::UniquenessConstraint(UniquenessConstraintRule {
                    id,
                    label,
                    property_key,
                    owned_index,
                })
            }),
    ]
}

/// Strategy for commands of every kind.
pub fn command_strategy() -> impl Strategy<Value = Command> {
    prop_oneof![
        (node_record_strategy(), node_record_strategy())
            .prop_map(|(before, after)| Command::Node { before, after }),
        (property_record_strategy(), property_record_strategy())
            .prop_map(|(before, after)| Command::Property { before, after }),
        (relationship_record_strategy(), relationship_record_strategy())
            .prop_map(|(before, after)| Command::Relationship { before, after }),
        (token_record_strategy(), token_record_strategy())
            .prop_map(|(before, after)| Command::RelationshipTypeToken { before, after }),
        (property_key_token_strategy(), property_key_token_strategy())
            .prop_map(|(before, after)| Command::PropertyKeyToken { before, after }),
        (any::<i64>(), any::<i64>()).prop_map(|(before, after)| Command::NeoStore {
            before: NeoStoreRecord { next_prop: before },
            after: NeoStoreRecord { next_prop: after },
        }),
        (
            dynamic_records_strategy(),
            dynamic_records_strategy(),
            schema_rule_strategy()
        )
            .prop_map(|(before, after, rule)| Command::SchemaRule {
                before,
                after,
                rule
            }),
        (token_record_strategy(), token_record_strategy())
            .prop_map(|(before, after)| Command::LabelToken { before, after }),
        relationship_group_strategy().prop_map(|record| Command::RelationshipGroup { record }),
    ]
}

/// Strategy for the commands of one transaction.
pub fn transaction_strategy(
    min_commands: usize,
    max_commands: usize,
) -> impl Strategy<Value = Vec<Command>> {
    prop::collection::vec(command_strategy(), min_commands..max_commands)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
