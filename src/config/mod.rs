//! Runtime configuration.
//!
//! Read from `config.toml` in the platform config directory (or an
//! explicit path). A missing file yields defaults. `RTA_API_URL` in the
//! environment wins over the file.

use crate::auth::{EndpointOverride, Role};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const API_URL_ENV: &str = "RTA_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API origin; request paths are appended verbatim.
    pub api_url: String,
    /// Where the session database lives. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    pub session: SessionConfig,
    /// Per-role endpoint overrides, keyed by wire tag (`[endpoints.sebi]`).
    pub endpoints: BTreeMap<Role, EndpointOverride>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            data_dir: None,
            session: SessionConfig::default(),
            endpoints: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub validation_delay_ms: u64,
    pub min_token_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            validation_delay_ms: 1000,
            min_token_len: crate::auth::payload::MIN_TOKEN_LEN,
        }
    }
}

impl SessionConfig {
    pub fn validation_delay(&self) -> Duration {
        Duration::from_millis(self.validation_delay_ms)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("in", "rta", "rta-session")
}

impl Config {
    /// Load from `path`, or the default location when `None`, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => project_dirs().map(|d| d.config_dir().join("config.toml")),
        };

        let mut config = match path {
            Some(ref p) if p.exists() => Self::from_file(p)?,
            _ => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {e}", path.display()))
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Blank values are ignored.
    pub fn apply_env_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
    }

    /// Directory holding `session.db`.
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        project_dirs()
            .map(|d| d.data_dir().to_path_buf())
            .ok_or_else(|| anyhow::anyhow!("Could not determine a data directory"))
    }

    pub fn session_db_path(&self) -> Result<PathBuf> {
        Ok(self.resolve_data_dir()?.join("session.db"))
    }
}
