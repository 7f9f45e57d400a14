//! Argus Configuration Module
//!
//! Runtime settings for the dispatcher, the config store and the converter.
//! Config is read from `~/.config/argus/config.toml` unless a path is given.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Command-line flags (applied by the binary)
//! 2. Environment variables (`ARGUS_WORKERS`, `ARGUS_QUEUE_CAPACITY`,
//!    `ARGUS_NAMESPACE`, `ARGUS_STORE_DIR`, `ARGUS_DEFAULT_IMAGE`)
//! 3. Config file
//! 4. Defaults

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dispatch::DispatcherConfig;
use crate::error::{ConvertError, Result};
use crate::util::constants::{
    DEFAULT_IMAGE, DEFAULT_NAMESPACE, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHELL, DEFAULT_WORKERS,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArgusConfig {
    #[serde(default)]
    pub dispatcher: DispatcherSection,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub converter: ConverterSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatcherSection {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for DispatcherSection {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreSection {
    /// Namespace holding the runner-label entries
    pub namespace: String,

    /// Directory laid out as `<dir>/<namespace>/<label>.yaml`.
    /// Without one every lookup misses and jobs use the default image.
    pub dir: Option<PathBuf>,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConverterSection {
    pub default_image: String,
    pub shell: String,
}

impl Default for ConverterSection {
    fn default() -> Self {
        Self {
            default_image: DEFAULT_IMAGE.to_string(),
            shell: DEFAULT_SHELL.to_string(),
        }
    }
}

impl ArgusConfig {
    /// Returns `~/.config/argus/` on Unix, `%APPDATA%/argus/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("argus")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from file
    ///
    /// Returns default config if file doesn't exist.
    /// Returns error if file exists but is malformed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConvertError::Config {
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConvertError::Config {
            reason: format!("Failed to parse config file: {}", e),
        })
    }

    /// Merge with process environment variables
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Merge with variables from `lookup`; empty values are ignored
    pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("ARGUS_WORKERS") {
            self.dispatcher.workers = parse_count("ARGUS_WORKERS", &v)?;
        }
        if let Some(v) = var("ARGUS_QUEUE_CAPACITY") {
            self.dispatcher.queue_capacity = parse_count("ARGUS_QUEUE_CAPACITY", &v)?;
        }
        if let Some(v) = var("ARGUS_NAMESPACE") {
            self.store.namespace = v;
        }
        if let Some(v) = var("ARGUS_STORE_DIR") {
            self.store.dir = Some(PathBuf::from(v));
        }
        if let Some(v) = var("ARGUS_DEFAULT_IMAGE") {
            self.converter.default_image = v;
        }

        Ok(self)
    }

    /// Reject settings no dispatcher or converter could run with
    pub fn validate(&self) -> Result<()> {
        self.dispatcher_config().validate()?;
        if self.store.namespace.trim().is_empty() {
            return Err(ConvertError::Config {
                reason: "store namespace must not be empty".to_string(),
            });
        }
        if self.converter.default_image.trim().is_empty() {
            return Err(ConvertError::Config {
                reason: "default image must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            workers: self.dispatcher.workers,
            queue_capacity: self.dispatcher.queue_capacity,
        }
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| ConvertError::Config {
        reason: format!("{key} must be a non-negative integer, got '{value}'"),
    })
}
