//! Configuration loading and management
//!
//! Handles parsing of `.todo.toml` configuration files. Every field has a
//! default, so a missing file or empty table yields a working configuration.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;

/// Configuration filename looked up next to the store
pub const CONFIG_FILE: &str = ".todo.toml";

/// Default store directory name
pub const DEFAULT_STORE_DIR: &str = ".todo_store";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Store location configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Lock configuration
    #[serde(default)]
    pub lock: LockConfig,
}

/// Store location configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store directory, relative to the configuration's base directory
    #[serde(default = "default_store_dir")]
    pub dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
        }
    }
}

fn default_store_dir() -> String {
    DEFAULT_STORE_DIR.to_string()
}

/// Lock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// How long a mutation waits for the store lock before failing
    #[serde(default = "default_lock_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_lock_timeout_ms(),
        }
    }
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Config {
    /// Load configuration from `.todo.toml` in the given directory.
    ///
    /// A missing file yields the defaults; a malformed file is an error.
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(CONFIG_FILE);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };
        Ok(toml::from_str(&contents)?)
    }
}
