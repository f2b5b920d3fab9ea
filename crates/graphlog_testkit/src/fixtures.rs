//! Sample commands and log helpers.
//!
//! [`sample_command`] builds one representative command per kind, with
//! nested dynamic records where the kind carries them, so that byte-level
//! tests exercise every tag and every sequence field.

use graphlog_core::{
    Command, CommandKind, CommandWriter, DynamicRecord, IndexProviderDescriptor, IndexRule,
    NeoStoreRecord, NodeRecord, PropertyBlock, PropertyKeyTokenRecord, PropertyOwner,
    PropertyRecord, RelationshipGroupRecord, RelationshipRecord, SchemaRule, TokenRecord,
    UniquenessConstraintRule,
};
use graphlog_storage::InMemoryLogChannel;

/// A dynamic record with a short payload.
pub fn dynamic_record(id: i64, in_use: bool, start_record: bool, next_block: i64, data: &str) -> DynamicRecord {
    DynamicRecord::with_data(id, in_use, start_record, next_block, 1, data.as_bytes())
}

/// The node change used throughout the truncation tests: node 12 created
/// with relationship and property chains starting at 13.
pub fn node_12_command() -> Command {
    Command::Node {
        before: NodeRecord::new(12),
        after: NodeRecord::in_use(12, false, 13, 13),
    }
}

/// Returns a representative command of `kind`.
pub fn sample_command(kind: CommandKind) -> Command {
    match kind {
        CommandKind::Node => {
            let mut after = NodeRecord::in_use(12, true, 13, 13);
            after.label_field = 0x0800_0000_0000_0001;
            after.dynamic_label_records = vec![dynamic_record(5, true, true, -1, "labels")];
            Command::Node {
                before: NodeRecord::new(12),
                after,
            }
        }
        CommandKind::Property => {
            let mut after = PropertyRecord::owned_by(1, PropertyOwner::Node(12));
            after.in_use = true;
            after.blocks = vec![
                PropertyBlock::inline(vec![0x1234_5678, 42]),
                PropertyBlock {
                    value_blocks: vec![7],
                    value_records: vec![
                        dynamic_record(20, true, true, 21, "a long "),
                        dynamic_record(21, true, false, -1, "string value"),
                    ],
                },
            ];
            let mut before = PropertyRecord::owned_by(1, PropertyOwner::Node(12));
            before.deleted_records = vec![dynamic_record(9, false, true, -1, "")];
            Command::Property { before, after }
        }
        CommandKind::Relationship => {
            let before = RelationshipRecord::new(3, 12, 14, 2);
            let mut after = before.clone();
            after.in_use = true;
            after.first_next_rel = 4;
            after.second_prev_rel = 2;
            after.first_in_second_chain = false;
            after.next_prop = 8;
            Command::Relationship { before, after }
        }
        CommandKind::RelationshipTypeToken => {
            let mut after = TokenRecord::new(2);
            after.in_use = true;
            after.name_id = 6;
            after.name_records = vec![dynamic_record(6, true, true, -1, "KNOWS")];
            Command::RelationshipTypeToken {
                before: TokenRecord::new(2),
                after,
            }
        }
        CommandKind::PropertyKeyToken => {
            let mut after = PropertyKeyTokenRecord::new(4);
            after.token.in_use = true;
            after.token.name_id = 11;
            after.token.name_records = vec![dynamic_record(11, true, true, -1, "name")];
            after.property_count = 3;
            Command::PropertyKeyToken {
                before: PropertyKeyTokenRecord::new(4),
                after,
            }
        }
        CommandKind::NeoStore => Command::NeoStore {
            before: NeoStoreRecord::default(),
            after: NeoStoreRecord { next_prop: 31 },
        },
        CommandKind::SchemaRule => Command::SchemaRule {
            before: Vec::new(),
            after: vec![dynamic_record(1, false, true, -1, "hello")],
            rule: SchemaRule::Index(IndexRule {
                id: 1,
                label: 3,
                property_key: 4,
                provider: IndexProviderDescriptor::new("1", "2"),
                owning_constraint: None,
            }),
        },
        CommandKind::LabelToken => {
            let mut after = TokenRecord::new(0);
            after.in_use = true;
            after.name_id = 2;
            after.name_records = vec![dynamic_record(2, true, true, -1, "Person")];
            Command::LabelToken {
                before: TokenRecord::new(0),
                after,
            }
        }
        CommandKind::RelationshipGroup => {
            let mut record = RelationshipGroupRecord::new(17, 2);
            record.in_use = true;
            record.first_out = 3;
            record.owning_node = 12;
            Command::RelationshipGroup { record }
        }
    }
}

/// One sample command per kind, in tag order.
pub fn sample_commands() -> Vec<Command> {
    CommandKind::ALL.into_iter().map(sample_command).collect()
}

/// Schema rule commands covering every rule shape.
pub fn schema_rule_commands() -> Vec<Command> {
    vec![
        sample_command(CommandKind::SchemaRule),
        Command::SchemaRule {
            before: vec![dynamic_record(2, true, true, -1, "old")],
            after: vec![dynamic_record(2, true, true, -1, "new")],
            rule: SchemaRule::Index(IndexRule {
                id: 2,
                label: 3,
                property_key: 5,
                provider: IndexProviderDescriptor::new("lucene", "1.0"),
                owning_constraint: Some(6),
            }),
        },
        Command::SchemaRule {
            before: Vec::new(),
            after: vec![dynamic_record(6, true, true, -1, "unique")],
            rule: SchemaRule::UniquenessConstraint(UniquenessConstraintRule {
                id: 6,
                label: 3,
                property_key: 5,
                owned_index: 2,
            }),
        },
    ]
}

/// Writes `commands` to a fresh in-memory channel.
pub fn write_commands(commands: &[Command]) -> InMemoryLogChannel {
    let mut channel = InMemoryLogChannel::new();
    for command in commands {
        CommandWriter::write_command_entry(&mut channel, command).expect("Failed to write command");
    }
    channel
}

/// Serializes a single command.
pub fn encode_command(command: &Command) -> Vec<u8> {
    write_commands(std::slice::from_ref(command)).to_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_samples_cover_every_kind() {
        let kinds: HashSet<_> = sample_commands().iter().map(Command::kind).collect();
        assert_eq!(kinds.len(), CommandKind::ALL.len());
    }

    #[test]
    fn test_sample_kinds_match() {
        for kind in CommandKind::ALL {
            assert_eq!(sample_command(kind).kind(), kind);
        }
    }

    #[test]
    fn test_encode_starts_with_tag() {
        for command in sample_commands() {
            let bytes = encode_command(&command);
            assert_eq!(bytes[0], command.kind().as_byte());
        }
    }
}
