//! Host settings and persisted configuration entries (TOML).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use openerz_core::model::ConfigEntry;
use openerz_core::scheduler::DEFAULT_LOOKAHEAD_DAYS;
use openerz_provider::BASE_URL;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the settings file location.
pub(crate) const CONFIG_ENV: &str = "OPENERZ_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "openerz.toml";

// twelve hours, matching the upstream sensor scan interval
const DEFAULT_POLL_INTERVAL_SECS: u64 = 12 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub base_url: String,
    pub user_agent: String,
    pub lookahead_days: u32,
    pub poll_interval_secs: u64,
    pub log_file: PathBuf,
    pub entries_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_owned(),
            user_agent: String::from("openerz/0.1"),
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            log_file: PathBuf::from("openerz.log"),
            entries_file: PathBuf::from("entries.toml"),
        }
    }
}

impl Settings {
    /// Loads settings, falling back to defaults when the file does not exist.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(60))
    }
}

/// Location of the settings file.
pub(crate) fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EntriesFile {
    #[serde(default, rename = "entry")]
    entries: Vec<ConfigEntry>,
}

/// Reads persisted entries. A missing file means no entries.
pub(crate) fn load_entries(path: &Path) -> Result<Vec<ConfigEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_entries(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Writes entries, creating parent directories if needed.
pub(crate) fn save_entries(path: &Path, entries: Vec<ConfigEntry>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let content = render_entries(entries)?;
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

fn parse_entries(content: &str) -> Result<Vec<ConfigEntry>> {
    let file: EntriesFile = toml::from_str(content)?;
    Ok(file.entries)
}

fn render_entries(entries: Vec<ConfigEntry>) -> Result<String> {
    toml::to_string_pretty(&EntriesFile { entries }).context("failed to serialize entries to TOML")
}
