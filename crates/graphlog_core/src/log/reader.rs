//! Command deserialization.

use super::format::{
    DYNAMIC_FLAGS, DYNAMIC_IN_USE, DYNAMIC_START_RECORD, IN_USE, NODE_DENSE, NODE_FLAGS,
    OWNER_NODE, OWNER_NONE, OWNER_RELATIONSHIP, RELATIONSHIP_FLAGS, REL_FIRST_IN_FIRST_CHAIN,
    REL_FIRST_IN_SECOND_CHAIN, SCHEMA_CONSTRAINT_INDEX, SCHEMA_INDEX,
    SCHEMA_UNIQUENESS_CONSTRAINT,
};
use crate::command::{Command, CommandKind};
use crate::error::{CoreError, CoreResult};
use crate::record::{
    DynamicRecord, IndexProviderDescriptor, IndexRule, NeoStoreRecord, NodeRecord, PropertyBlock,
    PropertyKeyTokenRecord, PropertyOwner, PropertyRecord, RelationshipGroupRecord,
    RelationshipRecord, SchemaRule, TokenRecord, UniquenessConstraintRule,
};
use graphlog_storage::ReadableLogChannel;

/// Upper bound on speculative preallocation for counted sequences.
///
/// Counts come from the log and may be garbage; vectors grow as elements
/// are actually read.
const MAX_PREALLOCATE: usize = 64;

/// Deserializes commands from a readable log channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandReader;

impl CommandReader {
    /// Reads the next command entry.
    ///
    /// Returns `Ok(None)` when the channel holds no further complete entry:
    /// either it is exhausted at an entry boundary or it ends part way
    /// through an entry (a torn tail). The channel's read position is then
    /// unspecified.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownCommandTag`] for a tag no command kind
    /// uses, [`CoreError::Corruption`] for structurally invalid content
    /// (negative counts, unknown flag bits, invalid strings) and
    /// [`CoreError::Channel`] for failures other than running out of data.
    pub fn read<C>(channel: &mut C) -> CoreResult<Option<Command>>
    where
        C: ReadableLogChannel + ?Sized,
    {
        if !channel.has_more_data()? {
            return Ok(None);
        }

        match read_entry(channel) {
            Ok(command) => Ok(Some(command)),
            Err(err) if err.is_read_past_end() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn read_entry<C: ReadableLogChannel + ?Sized>(channel: &mut C) -> CoreResult<Command> {
    let position = channel.current_position();
    let tag = channel.get()?;
    let kind = CommandKind::from_byte(tag).ok_or(CoreError::UnknownCommandTag { tag, position })?;

    let command = match kind {
        CommandKind::Node => Command::Node {
            before: read_node(channel)?,
            after: read_node(channel)?,
        },
        CommandKind::Property => Command::Property {
            before: read_property(channel)?,
            after: read_property(channel)?,
        },
        CommandKind::Relationship => Command::Relationship {
            before: read_relationship(channel)?,
            after: read_relationship(channel)?,
        },
        CommandKind::RelationshipTypeToken => Command::RelationshipTypeToken {
            before: read_token(channel)?,
            after: read_token(channel)?,
        },
        CommandKind::PropertyKeyToken => Command::PropertyKeyToken {
            before: read_property_key_token(channel)?,
            after: read_property_key_token(channel)?,
        },
        CommandKind::NeoStore => Command::NeoStore {
            before: NeoStoreRecord {
                next_prop: channel.get_i64()?,
            },
            after: NeoStoreRecord {
                next_prop: channel.get_i64()?,
            },
        },
        CommandKind::SchemaRule => Command::SchemaRule {
            before: read_dynamic_records(channel)?,
            after: read_dynamic_records(channel)?,
            rule: read_schema_rule(channel)?,
        },
        CommandKind::LabelToken => Command::LabelToken {
            before: read_token(channel)?,
            after: read_token(channel)?,
        },
        CommandKind::RelationshipGroup => Command::RelationshipGroup {
            record: read_relationship_group(channel)?,
        },
    };
    Ok(command)
}

fn read_count<C: ReadableLogChannel + ?Sized>(channel: &mut C, what: &str) -> CoreResult<usize> {
    let count = channel.get_i32()?;
    usize::try_from(count)
        .map_err(|_| CoreError::corruption(format!("negative {what} count {count}")))
}

fn read_flags<C: ReadableLogChannel + ?Sized>(
    channel: &mut C,
    allowed: u8,
    what: &str,
) -> CoreResult<u8> {
    let flags = channel.get()?;
    if flags & !allowed != 0 {
        return Err(CoreError::corruption(format!(
            "unknown {what} flag bits {flags:#010b}"
        )));
    }
    Ok(flags)
}

fn read_string<C: ReadableLogChannel + ?Sized>(channel: &mut C, what: &str) -> CoreResult<String> {
    let len = read_count(channel, what)?;
    let chars = channel.get_chars(len)?;
    String::from_utf16(&chars).map_err(|_| CoreError::corruption(format!("invalid UTF-16 in {what}")))
}

fn read_dynamic<C: ReadableLogChannel + ?Sized>(channel: &mut C) -> CoreResult<DynamicRecord> {
    let id = channel.get_i64()?;
    let flags = read_flags(channel, DYNAMIC_FLAGS, "dynamic record")?;
    let next_block = channel.get_i64()?;
    let record_type = channel.get_i32()?;
    let len = read_count(channel, "dynamic record data")?;
    let data = channel.get_bytes(len)?;
    Ok(DynamicRecord {
        id,
        in_use: flags & DYNAMIC_IN_USE != 0,
        start_record: flags & DYNAMIC_START_RECORD != 0,
        next_block,
        record_type,
        data,
    })
}

fn read_dynamic_records<C: ReadableLogChannel + ?Sized>(
    channel: &mut C,
) -> CoreResult<Vec<DynamicRecord>> {
    let count = read_count(channel, "dynamic record")?;
    let mut records = Vec::with_capacity(count.min(MAX_PREALLOCATE));
    for _ in 0..count {
        records.push(read_dynamic(channel)?);
    }
    Ok(records)
}

fn read_node<C: ReadableLogChannel + ?Sized>(channel: &mut C) -> CoreResult<NodeRecord> {
    let id = channel.get_i64()?;
    let flags = read_flags(channel, NODE_FLAGS, "node")?;
    Ok(NodeRecord {
        id,
        in_use: flags & IN_USE != 0,
        dense: flags & NODE_DENSE != 0,
        next_rel: channel.get_i64()?,
        next_prop: channel.get_i64()?,
        label_field: channel.get_i64()?,
        dynamic_label_records: read_dynamic_records(channel)?,
    })
}

fn read_relationship<C: ReadableLogChannel + ?Sized>(channel: &mut C) -> CoreResult<RelationshipRecord> {
    let id = channel.get_i64()?;
    let flags = read_flags(channel, RELATIONSHIP_FLAGS, "relationship")?;
    Ok(RelationshipRecord {
        id,
        in_use: flags & IN_USE != 0,
        first_node: channel.get_i64()?,
        second_node: channel.get_i64()?,
        rel_type: channel.get_i32()?,
        first_prev_rel: channel.get_i64()?,
        first_next_rel: channel.get_i64()?,
        second_prev_rel: channel.get_i64()?,
        second_next_rel: channel.get_i64()?,
        next_prop: channel.get_i64()?,
        first_in_first_chain: flags & REL_FIRST_IN_FIRST_CHAIN != 0,
        first_in_second_chain: flags & REL_FIRST_IN_SECOND_CHAIN != 0,
    })
}

fn read_relationship_group<C: ReadableLogChannel + ?Sized>(
    channel: &mut C,
) -> CoreResult<RelationshipGroupRecord> {
    let id = channel.get_i64()?;
    let flags = read_flags(channel, IN_USE, "relationship group")?;
    Ok(RelationshipGroupRecord {
        id,
        in_use: flags & IN_USE != 0,
        rel_type: channel.get_i32()?,
        next: channel.get_i64()?,
        first_out: channel.get_i64()?,
        first_in: channel.get_i64()?,
        first_loop: channel.get_i64()?,
        owning_node: channel.get_i64()?,
    })
}

fn read_property_block<C: ReadableLogChannel + ?Sized>(channel: &mut C) -> CoreResult<PropertyBlock> {
    let count = read_count(channel, "property value block")?;
    let mut value_blocks = Vec::with_capacity(count.min(MAX_PREALLOCATE));
    for _ in 0..count {
        value_blocks.push(channel.get_i64()?);
    }
    Ok(PropertyBlock {
        value_blocks,
        value_records: read_dynamic_records(channel)?,
    })
}

fn read_property<C: ReadableLogChannel + ?Sized>(channel: &mut C) -> CoreResult<PropertyRecord> {
    let id = channel.get_i64()?;
    let flags = read_flags(channel, IN_USE, "property")?;
    let prev_prop = channel.get_i64()?;
    let next_prop = channel.get_i64()?;

    let owner = match channel.get()? {
        OWNER_NONE => PropertyOwner::None,
        OWNER_NODE => PropertyOwner::Node(channel.get_i64()?),
        OWNER_RELATIONSHIP => PropertyOwner::Relationship(channel.get_i64()?),
        other => {
            return Err(CoreError::corruption(format!(
                "unknown property owner kind {other}"
            )))
        }
    };

    let count = read_count(channel, "property block")?;
    let mut blocks = Vec::with_capacity(count.min(MAX_PREALLOCATE));
    for _ in 0..count {
        blocks.push(read_property_block(channel)?);
    }

    Ok(PropertyRecord {
        id,
        in_use: flags & IN_USE != 0,
        prev_prop,
        next_prop,
        owner,
        blocks,
        deleted_records: read_dynamic_records(channel)?,
    })
}

fn read_token<C: ReadableLogChannel + ?Sized>(channel: &mut C) -> CoreResult<TokenRecord> {
    let id = channel.get_i32()?;
    let flags = read_flags(channel, IN_USE, "token")?;
    Ok(TokenRecord {
        id,
        in_use: flags & IN_USE != 0,
        name_id: channel.get_i32()?,
        name_records: read_dynamic_records(channel)?,
    })
}

fn read_property_key_token<C: ReadableLogChannel + ?Sized>(
    channel: &mut C,
) -> CoreResult<PropertyKeyTokenRecord> {
    Ok(PropertyKeyTokenRecord {
        token: read_token(channel)?,
        property_count: channel.get_i32()?,
    })
}

fn read_schema_rule<C: ReadableLogChannel + ?Sized>(channel: &mut C) -> CoreResult<SchemaRule> {
    let kind = channel.get()?;
    let rule = match kind {
        SCHEMA_INDEX | SCHEMA_CONSTRAINT_INDEX => {
            let id = channel.get_i64()?;
            let label = channel.get_i32()?;
            let property_key = channel.get_i32()?;
            let key = read_string(channel, "index provider key")?;
            let version = read_string(channel, "index provider version")?;
            let owning_constraint = if kind == SCHEMA_CONSTRAINT_INDEX {
                Some(channel.get_i64()?)
            } else {
                None
            };
            SchemaRule::Index(IndexRule {
                id,
                label,
                property_key,
                provider: IndexProviderDescriptor { key, version },
                owning_constraint,
            })
        }
        SCHEMA_UNIQUENESS_CONSTRAINT => SchemaRule::UniquenessConstraint(UniquenessConstraintRule {
            id: channel.get_i64()?,
            label: channel.get_i32()?,
            property_key: channel.get_i32()?,
            owned_index: channel.get_i64()?,
        }),
        other => {
            return Err(CoreError::corruption(format!(
                "unknown schema rule kind {other}"
            )))
        }
    };
    Ok(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::CommandWriter;
    use graphlog_storage::{InMemoryLogChannel, WritableLogChannel};

    fn node_command() -> Command {
        Command::Node {
            before: NodeRecord::new(12),
            after: NodeRecord::in_use(12, false, 13, 13),
        }
    }

    #[test]
    fn empty_channel_reads_none() {
        let mut channel = InMemoryLogChannel::new();
        assert!(CommandReader::read(&mut channel).unwrap().is_none());
    }

    #[test]
    fn node_roundtrip() {
        let mut channel = InMemoryLogChannel::new();
        CommandWriter::write_command_entry(&mut channel, &node_command()).unwrap();

        let read = CommandReader::read(&mut channel).unwrap().unwrap();
        assert_eq!(read, node_command());
        match read {
            Command::Node { after, .. } => {
                assert!(after.in_use);
                assert_eq!(after.next_rel, 13);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(CommandReader::read(&mut channel).unwrap().is_none());
    }

    #[test]
    fn unknown_tag() {
        let mut channel = InMemoryLogChannel::with_data(&[0xEE, 0, 0, 0]);
        let err = CommandReader::read(&mut channel).unwrap_err();
        assert!(matches!(err, CoreError::UnknownCommandTag { tag: 0xEE, .. }));
        assert!(err.is_corruption());
    }

    #[test]
    fn zero_tag_is_unknown() {
        let mut channel = InMemoryLogChannel::with_data(&[0]);
        assert!(matches!(
            CommandReader::read(&mut channel),
            Err(CoreError::UnknownCommandTag { tag: 0, .. })
        ));
    }

    #[test]
    fn tag_only_is_incomplete() {
        let mut channel = InMemoryLogChannel::with_data(&[CommandKind::Node.as_byte()]);
        assert!(CommandReader::read(&mut channel).unwrap().is_none());
    }

    #[test]
    fn negative_count_is_corruption() {
        let mut channel = InMemoryLogChannel::new();
        channel.put(CommandKind::SchemaRule.as_byte()).unwrap();
        channel.put_i32(-1).unwrap();
        let err = CommandReader::read(&mut channel).unwrap_err();
        assert!(matches!(err, CoreError::Corruption { .. }));
    }

    #[test]
    fn unknown_flag_bits_are_corruption() {
        let mut channel = InMemoryLogChannel::new();
        channel.put(CommandKind::Node.as_byte()).unwrap();
        channel.put_i64(1).unwrap();
        channel.put(0b1000_0000).unwrap();
        let err = CommandReader::read(&mut channel).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn huge_count_on_short_log_is_incomplete() {
        let mut channel = InMemoryLogChannel::new();
        channel.put(CommandKind::SchemaRule.as_byte()).unwrap();
        channel.put_i32(i32::MAX).unwrap();
        channel.put_i64(1).unwrap();
        assert!(CommandReader::read(&mut channel).unwrap().is_none());
    }

    #[test]
    fn invalid_utf16_is_corruption() {
        let mut channel = InMemoryLogChannel::new();
        channel.put(CommandKind::SchemaRule.as_byte()).unwrap();
        channel.put_i32(0).unwrap(); // before
        channel.put_i32(0).unwrap(); // after
        channel.put(SCHEMA_INDEX).unwrap();
        channel.put_i64(1).unwrap();
        channel.put_i32(3).unwrap();
        channel.put_i32(4).unwrap();
        channel.put_i32(1).unwrap();
        channel.put_chars(&[0xD800]).unwrap(); // lone surrogate
        let err = CommandReader::read(&mut channel).unwrap_err();
        assert!(matches!(err, CoreError::Corruption { .. }));
    }

    proptest::proptest! {
        #[test]
        fn arbitrary_bytes_never_panic(
            data in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..256),
        ) {
            let mut channel = InMemoryLogChannel::with_data(&data);
            while let Ok(Some(_)) = CommandReader::read(&mut channel) {
                proptest::prop_assert!(channel.current_position().byte_offset() <= data.len() as u64);
            }
        }
    }
}
