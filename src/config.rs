//! Configuration loading and management
//!
//! Handles parsing of `tasklink.toml` from the data directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Name of the configuration file inside the data directory
pub const CONFIG_FILENAME: &str = "tasklink.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Share link configuration
    #[serde(default)]
    pub share: ShareConfig,

    /// Default identity configuration
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Document store configuration
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            share: ShareConfig::default(),
            identity: IdentityConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Share link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Base URL that public task links are derived from
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Fallback identity used when no sign-in file and no flags are present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Default email
    #[serde(default)]
    pub email: Option<String>,

    /// Default display name
    #[serde(default)]
    pub name: Option<String>,
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Lock timeout for collection writes, in milliseconds
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    crate::lock::DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a specific file path
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the data directory.
    ///
    /// A missing file yields the defaults; a malformed file is reported via
    /// a warning and also yields the defaults, so a stray edit never bricks
    /// the CLI.
    pub fn load_from_dir(data_dir: &Path) -> Self {
        let path = data_dir.join(CONFIG_FILENAME);
        if !path.exists() {
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Path to the config file inside a data directory
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILENAME)
    }
}
