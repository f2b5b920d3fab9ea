//! Dump command implementation.

use super::CliError;
use graphlog_core::{read_log_header, Command, CommandIterator, LogConfig, LogHeader};
use graphlog_storage::FileLogChannel;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Command entry representation for output.
#[derive(Debug, Serialize)]
pub struct CommandInfo {
    /// Byte offset of the entry in the log file.
    pub offset: u64,
    /// Command kind.
    pub kind: String,
    /// Command tag byte.
    pub tag: u8,
    /// Id of the changed entity (-1 for store-wide commands).
    pub key: i64,
    /// Short description of the change.
    pub change: String,
}

/// Everything read from a log file.
#[derive(Debug, Serialize)]
pub struct LogDump {
    /// Log version from the header.
    pub log_version: u64,
    /// Last committed transaction from the header.
    pub last_committed_tx: u64,
    /// Commands read, in log order.
    pub commands: Vec<CommandInfo>,
    /// Whether the log ends with an incomplete entry.
    pub torn_tail: bool,
    /// Error that stopped reading, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the dump command.
pub fn run(path: &Path, limit: Option<usize>, format: &str) -> Result<(), CliError> {
    let dump = read_log(path, limit, &LogConfig::default())?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&dump)?);
        }
        _ => {
            print_text_output(&dump);
        }
    }

    Ok(())
}

/// Reads up to `limit` commands from the log file at `path`.
///
/// A corrupt entry does not fail the dump: it ends the command list and is
/// reported in [`LogDump::error`].
pub fn read_log(path: &Path, limit: Option<usize>, config: &LogConfig) -> Result<LogDump, CliError> {
    if !path.exists() {
        return Err(CliError::NotFound(path.to_path_buf()));
    }
    let header =
        read_log_header(path)?.ok_or_else(|| CliError::MissingHeader(path.to_path_buf()))?;

    let mut channel = FileLogChannel::open_with(path, config.channel_options(header.log_version))
        .map_err(graphlog_core::CoreError::from)?;
    LogHeader::read(&mut channel)?;

    let max_commands = limit.unwrap_or(usize::MAX);
    let mut commands = Vec::new();
    let mut error = None;

    let mut iter = CommandIterator::new(&mut channel);
    while commands.len() < max_commands {
        match iter.next() {
            Some(Ok((position, command))) => commands.push(describe(position.byte_offset(), &command)),
            Some(Err(e)) => {
                error = Some(e.to_string());
                break;
            }
            None => break,
        }
    }
    let torn_tail = iter.torn_tail();
    debug!(commands = commands.len(), torn_tail, "read log for dump");

    Ok(LogDump {
        log_version: header.log_version,
        last_committed_tx: header.last_committed_tx,
        commands,
        torn_tail,
        error,
    })
}

fn describe(offset: u64, command: &Command) -> CommandInfo {
    let change = match command {
        Command::Node { before, after } => in_use_change(before.in_use, after.in_use),
        Command::Property { before, after } => in_use_change(before.in_use, after.in_use),
        Command::Relationship { before, after } => format!(
            "{} ({} -> {})",
            in_use_change(before.in_use, after.in_use),
            after.first_node,
            after.second_node
        ),
        Command::RelationshipTypeToken { before, after } | Command::LabelToken { before, after } => {
            in_use_change(before.in_use, after.in_use)
        }
        Command::PropertyKeyToken { before, after } => {
            in_use_change(before.token.in_use, after.token.in_use)
        }
        Command::NeoStore { before, after } => {
            format!("next_prop {} -> {}", before.next_prop, after.next_prop)
        }
        Command::SchemaRule { after, rule, .. } => format!(
            "label {} property {} ({} records)",
            rule.label(),
            rule.property_key(),
            after.len()
        ),
        Command::RelationshipGroup { record } => format!(
            "{} owner={}",
            if record.in_use { "in use" } else { "not in use" },
            record.owning_node
        ),
    };

    CommandInfo {
        offset,
        kind: command.kind().to_string(),
        tag: command.kind().as_byte(),
        key: command.key(),
        change,
    }
}

fn in_use_change(before: bool, after: bool) -> String {
    match (before, after) {
        (false, true) => "created",
        (true, false) => "deleted",
        (true, true) => "updated",
        (false, false) => "unused",
    }
    .to_string()
}

fn print_text_output(dump: &LogDump) {
    println!(
        "Log version {} (last committed tx {}), {} commands",
        dump.log_version,
        dump.last_committed_tx,
        dump.commands.len()
    );
    println!("================");
    println!();

    for command in &dump.commands {
        println!(
            "[{:08}] {:24} id={} {}",
            command.offset, command.kind, command.key, command.change
        );
    }

    if dump.torn_tail {
        println!();
        println!("Log ends with an incomplete entry");
    }
    if let Some(ref error) = dump.error {
        println!();
        println!("ERROR: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphlog_core::{open_log_file, CommandWriter, NeoStoreRecord, NodeRecord};
    use graphlog_storage::WritableLogChannel;
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_log(path: &Path, commands: &[Command]) {
        let (mut channel, _) =
            open_log_file(path, LogHeader::new(3, 40), &LogConfig::default()).unwrap();
        for command in commands {
            CommandWriter::write_command_entry(&mut channel, command).unwrap();
        }
        channel.close().unwrap();
    }

    fn commands() -> Vec<Command> {
        vec![
            Command::Node {
                before: NodeRecord::new(12),
                after: NodeRecord::in_use(12, false, 13, 13),
            },
            Command::NeoStore {
                before: NeoStoreRecord::default(),
                after: NeoStoreRecord { next_prop: 31 },
            },
        ]
    }

    #[test]
    fn dumps_every_command() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.log.3");
        write_log(&path, &commands());

        let dump = read_log(&path, None, &LogConfig::default()).unwrap();
        assert_eq!(dump.log_version, 3);
        assert_eq!(dump.last_committed_tx, 40);
        assert_eq!(dump.commands.len(), 2);
        assert_eq!(dump.commands[0].offset, 16);
        assert_eq!(dump.commands[0].tag, 1);
        assert_eq!(dump.commands[0].key, 12);
        assert_eq!(dump.commands[0].change, "created");
        assert_eq!(dump.commands[1].offset, 16 + 75);
        assert_eq!(dump.commands[1].change, "next_prop -1 -> 31");
        assert!(!dump.torn_tail);
        assert!(dump.error.is_none());
    }

    #[test]
    fn respects_limit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.log.3");
        write_log(&path, &commands());

        let dump = read_log(&path, Some(1), &LogConfig::default()).unwrap();
        assert_eq!(dump.commands.len(), 1);
    }

    #[test]
    fn reports_unknown_tag() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.log.3");
        write_log(&path, &commands()[..1]);
        OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(&[77])
            .unwrap();

        let dump = read_log(&path, None, &LogConfig::default()).unwrap();
        assert_eq!(dump.commands.len(), 1);
        assert!(dump.error.unwrap().contains("unknown command tag 77"));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempdir().unwrap();
        let err = read_log(&dir.path().join("absent"), None, &LogConfig::default()).unwrap_err();
        assert!(matches!(err, CliError::NotFound(_)));
    }

    #[test]
    fn json_output_has_commands() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.log.3");
        write_log(&path, &commands());

        let dump = read_log(&path, None, &LogConfig::default()).unwrap();
        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["commands"][0]["kind"], dump.commands[0].kind.as_str());
        assert!(json.get("error").is_none());
    }
}
