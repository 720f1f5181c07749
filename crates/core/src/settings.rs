//! Debounce settings loaded from TOML
//!
//! ```toml
//! [store]
//! path = "/var/lib/lull/tickets.db"
//!
//! [tasks.Notify]
//! delay_secs = 60
//! delay_buffer_secs = 1
//! ```

use crate::coordinator::{DebounceConfig, DEFAULT_DELAY_BUFFER};
use crate::error::{Error, Result};
use crate::key::validate_task_type;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest delay or buffer accepted from a settings file (one week)
pub const MAX_DELAY_SECS: u64 = 7 * 24 * 60 * 60;

/// Top-level settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ticket store location
    pub store: StoreSettings,
    /// Debounce timing per task type
    pub tasks: BTreeMap<String, TaskSettings>,
}

/// Where tickets are persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// sled database path; the in-memory store is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Debounce timing for one task type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSettings {
    /// Debounce window in seconds
    pub delay_secs: u64,
    /// Slack added to the fire time (default: 1)
    #[serde(default = "default_delay_buffer_secs")]
    pub delay_buffer_secs: u64,
}

fn default_delay_buffer_secs() -> u64 {
    DEFAULT_DELAY_BUFFER.as_secs()
}

impl TaskSettings {
    pub fn debounce_config(&self) -> DebounceConfig {
        DebounceConfig::new(Duration::from_secs(self.delay_secs))
            .with_delay_buffer(Duration::from_secs(self.delay_buffer_secs))
    }
}

impl Settings {
    /// Parse and validate settings from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text)
            .map_err(|e| Error::config_with("failed to parse settings", e))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config_with(format!("failed to read {}", path.display()), e))?;
        Self::from_toml_str(&text)
    }

    /// Load settings from a file, or defaults if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Default settings location: `<config_dir>/lull/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lull").join("config.toml"))
    }

    /// Check task names and delay ranges
    pub fn validate(&self) -> Result<()> {
        for (name, task) in &self.tasks {
            validate_task_type(name)
                .map_err(|e| Error::config_with(format!("tasks.{}", name), e))?;

            if task.delay_secs > MAX_DELAY_SECS {
                return Err(Error::config(format!(
                    "tasks.{}.delay_secs must be at most {} (got {})",
                    name, MAX_DELAY_SECS, task.delay_secs
                )));
            }
            if task.delay_buffer_secs > MAX_DELAY_SECS {
                return Err(Error::config(format!(
                    "tasks.{}.delay_buffer_secs must be at most {} (got {})",
                    name, MAX_DELAY_SECS, task.delay_buffer_secs
                )));
            }
        }
        Ok(())
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config_with("failed to serialize settings", e))
    }

    /// Example settings file
    pub fn example() -> &'static str {
        r#"# lull debounce settings

[store]
# sled database holding debounce tickets (omit for an in-memory store)
path = "/var/lib/lull/tickets.db"

# One table per task type. The task name namespaces its keys and
# must not contain ':'.
[tasks.Notify]
# Quiet period before the last trigger runs
delay_secs = 60
# Extra slack added to the fire time (default: 1)
delay_buffer_secs = 1

[tasks.RecomputeSummary]
delay_secs = 300
"#
    }
}
