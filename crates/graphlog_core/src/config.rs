//! Transaction log configuration.

use crate::error::{CoreError, CoreResult};
use graphlog_storage::{FileChannelOptions, DEFAULT_READ_AHEAD, DEFAULT_ROTATION_THRESHOLD};
use std::collections::HashMap;
use tracing::warn;

/// Setting: size at which a log file is rotated.
pub const ROTATION_THRESHOLD_SETTING: &str = "logical_log_rotation_threshold";

/// Setting: whether a transaction is forced to disk once written.
pub const FORCE_ON_WRITE_SETTING: &str = "logical_log_force_on_write";

/// Setting: read-ahead buffer size used when reading log files.
pub const READ_AHEAD_SETTING: &str = "logical_log_read_ahead";

/// A renamed setting.
struct Migration {
    legacy: &'static str,
    current: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        legacy: "logical_log_size",
        current: ROTATION_THRESHOLD_SETTING,
    },
    Migration {
        legacy: "sync_logical_log",
        current: FORCE_ON_WRITE_SETTING,
    },
];

/// Configuration for the transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    /// Size in bytes at which a log file asks to be rotated.
    pub rotation_threshold: u64,

    /// Whether to force the channel after every transaction (safer but slower).
    pub force_on_write: bool,

    /// Read-ahead buffer size for file channels.
    pub read_ahead: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            rotation_threshold: DEFAULT_ROTATION_THRESHOLD, // 25 MiB
            force_on_write: true,
            read_ahead: DEFAULT_READ_AHEAD, // 64 KiB
        }
    }
}

impl LogConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rotation threshold.
    #[must_use]
    pub const fn rotation_threshold(mut self, size: u64) -> Self {
        self.rotation_threshold = size;
        self
    }

    /// Sets whether transactions are forced once written.
    #[must_use]
    pub const fn force_on_write(mut self, value: bool) -> Self {
        self.force_on_write = value;
        self
    }

    /// Sets the read-ahead buffer size.
    #[must_use]
    pub const fn read_ahead(mut self, size: usize) -> Self {
        self.read_ahead = size;
        self
    }

    /// Options for opening the file channel of log `log_version`.
    #[must_use]
    pub const fn channel_options(&self, log_version: u64) -> FileChannelOptions {
        FileChannelOptions {
            log_version,
            read_ahead: self.read_ahead,
            rotation_threshold: self.rotation_threshold,
        }
    }

    /// Builds a configuration from raw key/value settings.
    ///
    /// Unknown keys are ignored. Legacy setting names are migrated to their
    /// current names with a warning; when both are present the current name
    /// wins.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if a value cannot be parsed.
    pub fn from_settings(settings: &HashMap<String, String>) -> CoreResult<Self> {
        let settings = migrate(settings);
        let mut config = Self::default();

        if let Some(value) = settings.get(ROTATION_THRESHOLD_SETTING) {
            config.rotation_threshold = parse_size(ROTATION_THRESHOLD_SETTING, value)?;
        }
        if let Some(value) = settings.get(FORCE_ON_WRITE_SETTING) {
            config.force_on_write = parse_bool(FORCE_ON_WRITE_SETTING, value)?;
        }
        if let Some(value) = settings.get(READ_AHEAD_SETTING) {
            let size = parse_size(READ_AHEAD_SETTING, value)?;
            config.read_ahead = usize::try_from(size)
                .map_err(|_| CoreError::invalid_config(READ_AHEAD_SETTING, "value too large"))?;
        }
        Ok(config)
    }
}

fn migrate(settings: &HashMap<String, String>) -> HashMap<String, String> {
    let mut migrated = settings.clone();
    for migration in MIGRATIONS {
        let Some(value) = migrated.remove(migration.legacy) else {
            continue;
        };
        if migrated.contains_key(migration.current) {
            warn!(
                legacy = migration.legacy,
                current = migration.current,
                "ignoring deprecated setting, the current setting is also present"
            );
            continue;
        }
        warn!(
            legacy = migration.legacy,
            current = migration.current,
            "deprecated setting migrated, please use the current name"
        );
        migrated.insert(migration.current.to_string(), value);
    }
    migrated
}

fn parse_bool(key: &str, value: &str) -> CoreResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(CoreError::invalid_config(
            key,
            format!("expected true or false, got '{other}'"),
        )),
    }
}

/// Parses a byte size with an optional `k`, `m` or `g` suffix.
fn parse_size(key: &str, value: &str) -> CoreResult<u64> {
    let value = value.trim();
    let (digits, multiplier) = match value.chars().last() {
        Some('k' | 'K') => (&value[..value.len() - 1], 1u64 << 10),
        Some('m' | 'M') => (&value[..value.len() - 1], 1u64 << 20),
        Some('g' | 'G') => (&value[..value.len() - 1], 1u64 << 30),
        _ => (value, 1),
    };

    let number: u64 = digits
        .trim()
        .parse()
        .map_err(|_| CoreError::invalid_config(key, format!("invalid size '{value}'")))?;
    number
        .checked_mul(multiplier)
        .ok_or_else(|| CoreError::invalid_config(key, format!("size '{value}' overflows")))
}
