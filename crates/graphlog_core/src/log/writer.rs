//! Command serialization.
//!
//! Every entry starts with the one-byte command tag, followed by the
//! command's fields in declaration order. All multi-byte values are
//! big-endian. Variable-length sequences are prefixed with a 4-byte count,
//! strings with a 4-byte UTF-16 code unit count.

use super::format::{
    DYNAMIC_IN_USE, DYNAMIC_START_RECORD, IN_USE, NODE_DENSE, OWNER_NODE, OWNER_NONE,
    OWNER_RELATIONSHIP, REL_FIRST_IN_FIRST_CHAIN, REL_FIRST_IN_SECOND_CHAIN,
    SCHEMA_CONSTRAINT_INDEX, SCHEMA_INDEX, SCHEMA_UNIQUENESS_CONSTRAINT,
};
use crate::command::Command;
use crate::error::{CoreError, CoreResult};
use crate::record::{
    DynamicRecord, NodeRecord, PropertyBlock, PropertyKeyTokenRecord, PropertyOwner,
    PropertyRecord, RelationshipGroupRecord, RelationshipRecord, SchemaRule, TokenRecord,
};
use graphlog_storage::{ChannelResult, WritableLogChannel};

/// Serializes commands onto a writable log channel.
///
/// The writer holds no state and adds no buffering of its own. Durability
/// is the caller's business: call [`WritableLogChannel::force`] once a
/// transaction's commands are written.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandWriter;

impl CommandWriter {
    /// Appends one command entry to `channel`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] without writing anything if a
    /// sequence or string is too long for its count prefix, and
    /// [`CoreError::Channel`] if the channel rejects a write. A channel
    /// failure may leave a partial entry behind; readers treat it as a torn
    /// tail.
    pub fn write_command_entry<C>(channel: &mut C, command: &Command) -> CoreResult<usize>
    where
        C: WritableLogChannel + ?Sized,
    {
        check_lengths(command)?;

        let start = channel.write_position().byte_offset();
        channel.put(command.kind().as_byte())?;
        write_body(channel, command)?;
        let end = channel.write_position().byte_offset();

        usize::try_from(end.saturating_sub(start))
            .map_err(|_| CoreError::invalid_argument("command entry exceeds addressable size"))
    }
}

fn write_body<C: WritableLogChannel + ?Sized>(channel: &mut C, command: &Command) -> ChannelResult<()> {
    match command {
        Command::Node { before, after } => {
            write_node(channel, before)?;
            write_node(channel, after)
        }
        Command::Property { before, after } => {
            write_property(channel, before)?;
            write_property(channel, after)
        }
        Command::Relationship { before, after } => {
            write_relationship(channel, before)?;
            write_relationship(channel, after)
        }
        Command::RelationshipTypeToken { before, after } | Command::LabelToken { before, after } => {
            write_token(channel, before)?;
            write_token(channel, after)
        }
        Command::PropertyKeyToken { before, after } => {
            write_property_key_token(channel, before)?;
            write_property_key_token(channel, after)
        }
        Command::NeoStore { before, after } => {
            channel.put_i64(before.next_prop)?.put_i64(after.next_prop)?;
            Ok(())
        }
        Command::SchemaRule {
            before,
            after,
            rule,
        } => {
            write_dynamic_records(channel, before)?;
            write_dynamic_records(channel, after)?;
            write_schema_rule(channel, rule)
        }
        Command::RelationshipGroup { record } => write_relationship_group(channel, record),
    }
}

fn flag(set: bool, bit: u8) -> u8 {
    if set {
        bit
    } else {
        0
    }
}

// Lengths are validated up front, the casts below cannot truncate.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn put_count<C: WritableLogChannel + ?Sized>(channel: &mut C, count: usize) -> ChannelResult<()> {
    channel.put_i32(count as i32)?;
    Ok(())
}

fn put_string<C: WritableLogChannel + ?Sized>(channel: &mut C, value: &str) -> ChannelResult<()> {
    let chars: Vec<u16> = value.encode_utf16().collect();
    put_count(channel, chars.len())?;
    channel.put_chars(&chars)?;
    Ok(())
}

fn write_dynamic<C: WritableLogChannel + ?Sized>(
    channel: &mut C,
    record: &DynamicRecord,
) -> ChannelResult<()> {
    let flags = flag(record.in_use, DYNAMIC_IN_USE) | flag(record.start_record, DYNAMIC_START_RECORD);
    channel
        .put_i64(record.id)?
        .put(flags)?
        .put_i64(record.next_block)?
        .put_i32(record.record_type)?;
    put_count(channel, record.data.len())?;
    channel.put_bytes(&record.data)?;
    Ok(())
}

fn write_dynamic_records<C: WritableLogChannel + ?Sized>(
    channel: &mut C,
    records: &[DynamicRecord],
) -> ChannelResult<()> {
    put_count(channel, records.len())?;
    for record in records {
        write_dynamic(channel, record)?;
    }
    Ok(())
}

fn write_node<C: WritableLogChannel + ?Sized>(channel: &mut C, record: &NodeRecord) -> ChannelResult<()> {
    let flags = flag(record.in_use, IN_USE) | flag(record.dense, NODE_DENSE);
    channel
        .put_i64(record.id)?
        .put(flags)?
        .put_i64(record.next_rel)?
        .put_i64(record.next_prop)?
        .put_i64(record.label_field)?;
    write_dynamic_records(channel, &record.dynamic_label_records)
}

fn write_relationship<C: WritableLogChannel + ?Sized>(
    channel: &mut C,
    record: &RelationshipRecord,
) -> ChannelResult<()> {
    let flags = flag(record.in_use, IN_USE)
        | flag(record.first_in_first_chain, REL_FIRST_IN_FIRST_CHAIN)
        | flag(record.first_in_second_chain, REL_FIRST_IN_SECOND_CHAIN);
    channel
        .put_i64(record.id)?
        .put(flags)?
        .put_i64(record.first_node)?
        .put_i64(record.second_node)?
        .put_i32(record.rel_type)?
        .put_i64(record.first_prev_rel)?
        .put_i64(record.first_next_rel)?
        .put_i64(record.second_prev_rel)?
        .put_i64(record.second_next_rel)?
        .put_i64(record.next_prop)?;
    Ok(())
}

fn write_relationship_group<C: WritableLogChannel + ?Sized>(
    channel: &mut C,
    record: &RelationshipGroupRecord,
) -> ChannelResult<()> {
    channel
        .put_i64(record.id)?
        .put(flag(record.in_use, IN_USE))?
        .put_i32(record.rel_type)?
        .put_i64(record.next)?
        .put_i64(record.first_out)?
        .put_i64(record.first_in)?
        .put_i64(record.first_loop)?
        .put_i64(record.owning_node)?;
    Ok(())
}

fn write_property_block<C: WritableLogChannel + ?Sized>(
    channel: &mut C,
    block: &PropertyBlock,
) -> ChannelResult<()> {
    put_count(channel, block.value_blocks.len())?;
    for value in &block.value_blocks {
        channel.put_i64(*value)?;
    }
    write_dynamic_records(channel, &block.value_records)
}

fn write_property<C: WritableLogChannel + ?Sized>(
    channel: &mut C,
    record: &PropertyRecord,
) -> ChannelResult<()> {
    channel
        .put_i64(record.id)?
        .put(flag(record.in_use, IN_USE))?
        .put_i64(record.prev_prop)?
        .put_i64(record.next_prop)?;

    match record.owner {
        PropertyOwner::None => {
            channel.put(OWNER_NONE)?;
        }
        PropertyOwner::Node(id) => {
            channel.put(OWNER_NODE)?.put_i64(id)?;
        }
        PropertyOwner::Relationship(id) => {
            channel.put(OWNER_RELATIONSHIP)?.put_i64(id)?;
        }
    }

    put_count(channel, record.blocks.len())?;
    for block in &record.blocks {
        write_property_block(channel, block)?;
    }
    write_dynamic_records(channel, &record.deleted_records)
}

fn write_token<C: WritableLogChannel + ?Sized>(channel: &mut C, record: &TokenRecord) -> ChannelResult<()> {
    channel
        .put_i32(record.id)?
        .put(flag(record.in_use, IN_USE))?
        .put_i32(record.name_id)?;
    write_dynamic_records(channel, &record.name_records)
}

fn write_property_key_token<C: WritableLogChannel + ?Sized>(
    channel: &mut C,
    record: &PropertyKeyTokenRecord,
) -> ChannelResult<()> {
    write_token(channel, &record.token)?;
    channel.put_i32(record.property_count)?;
    Ok(())
}

fn write_schema_rule<C: WritableLogChannel + ?Sized>(channel: &mut C, rule: &SchemaRule) -> ChannelResult<()> {
    match rule {
        SchemaRule::Index(index) => {
            let kind = if index.owning_constraint.is_some() {
                SCHEMA_CONSTRAINT_INDEX
            } else {
                SCHEMA_INDEX
            };
            channel
                .put(kind)?
                .put_i64(index.id)?
                .put_i32(index.label)?
                .put_i32(index.property_key)?;
            put_string(channel, &index.provider.key)?;
            put_string(channel, &index.provider.version)?;
            if let Some(owner) = index.owning_constraint {
                channel.put_i64(owner)?;
            }
        }
        SchemaRule::UniquenessConstraint(constraint) => {
            channel
                .put(SCHEMA_UNIQUENESS_CONSTRAINT)?
                .put_i64(constraint.id)?
                .put_i32(constraint.label)?
                .put_i32(constraint.property_key)?
                .put_i64(constraint.owned_index)?;
        }
    }
    Ok(())
}

/// Rejects commands whose sequences or strings overflow a count prefix.
fn check_lengths(command: &Command) -> CoreResult<()> {
    fn count(what: &str, len: usize) -> CoreResult<()> {
        if i32::try_from(len).is_ok() {
            Ok(())
        } else {
            Err(CoreError::invalid_argument(format!(
                "{what} has {len} entries, more than a log entry can hold"
            )))
        }
    }

    fn dynamics(what: &str, records: &[DynamicRecord]) -> CoreResult<()> {
        count(what, records.len())?;
        records
            .iter()
            .try_for_each(|record| count("dynamic record data", record.data.len()))
    }

    fn property(record: &PropertyRecord) -> CoreResult<()> {
        count("property blocks", record.blocks.len())?;
        for block in &record.blocks {
            count("property value blocks", block.value_blocks.len())?;
            dynamics("property value records", &block.value_records)?;
        }
        dynamics("deleted property records", &record.deleted_records)
    }

    match command {
        Command::Node { before, after } => {
            dynamics("node label records", &before.dynamic_label_records)?;
            dynamics("node label records", &after.dynamic_label_records)
        }
        Command::Property { before, after } => {
            property(before)?;
            property(after)
        }
        Command::RelationshipTypeToken { before, after } | Command::LabelToken { before, after } => {
            dynamics("token name records", &before.name_records)?;
            dynamics("token name records", &after.name_records)
        }
        Command::PropertyKeyToken { before, after } => {
            dynamics("token name records", &before.token.name_records)?;
            dynamics("token name records", &after.token.name_records)
        }
        Command::SchemaRule {
            before,
            after,
            rule,
        } => {
            dynamics("schema records", before)?;
            dynamics("schema records", after)?;
            if let SchemaRule::Index(index) = rule {
                count("index provider key", index.provider.key.encode_utf16().count())?;
                count(
                    "index provider version",
                    index.provider.version.encode_utf16().count(),
                )?;
            }
            Ok(())
        }
        Command::Relationship { .. } | Command::NeoStore { .. } | Command::RelationshipGroup { .. } => {
            Ok(())
        }
    }
}
