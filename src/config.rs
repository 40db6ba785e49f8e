//! Configuration loaded from `swarmwatch.toml`.
//!
//! Every field has a default, so an empty or missing file is a valid
//! configuration. Environment variables override the file, and CLI flags
//! override both.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::render::{DEFAULT_MAX_AGENTS, DEFAULT_MAX_TASKS};
use crate::source::RemoteSourceConfig;

pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 4000;
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:50001";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const CONFIG_FILE_NAME: &str = "swarmwatch.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// What a section shows when its fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorDisplay {
    /// Leave the last successful render in place.
    #[default]
    KeepPrevious,
    /// Replace the section with its empty placeholder.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    pub refresh_interval_ms: u64,
    pub max_tasks: usize,
    pub max_agents: usize,
    pub on_error: ErrorDisplay,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            max_tasks: DEFAULT_MAX_TASKS,
            max_agents: DEFAULT_MAX_AGENTS,
            on_error: ErrorDisplay::KeepPrevious,
        }
    }
}

impl PanelSettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            context_id: None,
        }
    }
}

impl RemoteSettings {
    pub fn source_config(&self) -> RemoteSourceConfig {
        RemoteSourceConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub panel: PanelSettings,
    pub remote: RemoteSettings,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load `path` if it exists, otherwise the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply `SWARMWATCH_POLL_MS`, `SWARMWATCH_ENDPOINT` and
    /// `SWARMWATCH_CONTEXT` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(ms) = lookup("SWARMWATCH_POLL_MS").and_then(|v| v.parse().ok()) {
            self.panel.refresh_interval_ms = ms;
        }
        if let Some(url) = lookup("SWARMWATCH_ENDPOINT").filter(|v| !v.is_empty()) {
            self.remote.base_url = url;
        }
        if let Some(ctx) = lookup("SWARMWATCH_CONTEXT").filter(|v| !v.is_empty()) {
            self.remote.context_id = Some(ctx);
        }
    }
}
