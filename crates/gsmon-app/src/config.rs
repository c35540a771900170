//! Application settings.
//!
//! Loaded from `~/.config/gsmon/config.toml` when present, with defaults
//! for everything so a fresh checkout works against a local backend.
//! `GSMON_BACKEND_URL` and `GSMON_AUTH_TOKEN` override the file — the
//! token override is how CI and scripts avoid writing secrets to disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use gsmon_core::prelude::*;

/// Reconnect tuning for install streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Maximum consecutive reconnect attempts before giving up
    pub max_retries: u32,

    /// Base reconnect delay in seconds; attempt N waits N × this
    pub retry_base_delay_secs: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_secs: 2,
        }
    }
}

impl StreamSettings {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_secs(self.retry_base_delay_secs)
    }
}

/// Top-level gsmon settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the backend API
    pub backend_url: String,

    /// Bearer token for the backend; attached to plain requests as a
    /// header and to stream URLs as a query parameter
    pub auth_token: Option<String>,

    pub stream: StreamSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000/api".to_string(),
            auth_token: None,
            stream: StreamSettings::default(),
        }
    }
}

impl Settings {
    /// Default config file location (`~/.config/gsmon/config.toml`)
    pub fn config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("gsmon").join("config.toml")
    }

    /// Load settings from the default location, falling back to defaults
    /// when no file exists, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let mut settings = if path.exists() {
            Self::load_from(&path)?
        } else {
            debug!("no config file at {}, using defaults", path.display());
            Self::default()
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Load settings from a specific file. A malformed file is an error —
    /// silently ignoring a typo'd config is worse than refusing to start.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))
    }

    /// Apply `GSMON_BACKEND_URL` / `GSMON_AUTH_TOKEN` overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("GSMON_BACKEND_URL").ok(),
            std::env::var("GSMON_AUTH_TOKEN").ok(),
        );
    }

    fn apply_overrides(&mut self, backend_url: Option<String>, auth_token: Option<String>) {
        if let Some(url) = backend_url.filter(|v| !v.is_empty()) {
            self.backend_url = url;
        }
        if let Some(token) = auth_token.filter(|v| !v.is_empty()) {
            self.auth_token = Some(token);
        }
    }
}
