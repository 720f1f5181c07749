//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use lull_core::{Settings, SledTicketStore};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Settings file to use: the `--config` flag, else the default location
pub fn settings_path(flag: Option<&Path>) -> Result<PathBuf> {
    match flag {
        Some(path) => Ok(path.to_path_buf()),
        None => Settings::default_path().context("Could not determine config directory"),
    }
}

/// Load settings, falling back to defaults when the file does not exist
pub fn load_settings(flag: Option<&Path>) -> Result<Settings> {
    let path = settings_path(flag)?;
    Settings::load_or_default(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))
}

/// Open the ticket database named by `--db`, else by `store.path` in settings
pub fn open_ticket_db(config: Option<&Path>, db: Option<PathBuf>) -> Result<SledTicketStore> {
    let path = match db {
        Some(path) => path,
        None => load_settings(config)?
            .store
            .path
            .context("No ticket database given (use --db or set store.path in settings)")?,
    };

    SledTicketStore::open(&path)
        .with_context(|| format!("Failed to open ticket database {}", path.display()))
}

/// Parse a command-line argument as JSON, falling back to a plain string
pub fn parse_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Format a fire time relative to now ("in 61 seconds", "3 seconds ago")
///
/// Seconds are kept up to two minutes so typical debounce windows read exactly.
pub fn format_relative_secs(fire_at: i64, now: i64) -> String {
    let delta = fire_at.saturating_sub(now);
    let magnitude = delta.unsigned_abs();

    let amount = if magnitude < 120 {
        plural(magnitude, "second")
    } else if magnitude < 7200 {
        plural(magnitude / 60, "minute")
    } else if magnitude < 2 * 86400 {
        plural(magnitude / 3600, "hour")
    } else {
        plural(magnitude / 86400, "day")
    };

    if delta >= 0 {
        format!("in {}", amount)
    } else {
        format!("{} ago", amount)
    }
}

fn plural(count: u64, unit: &str) -> String {
    if count == 1 {
        format!("{} {}", count, unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

/// Shorten a hex execution id for display
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
