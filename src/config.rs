//! Configuration for the TeachBack tools
//!
//! TOML format, by default at `<config dir>/teachback/config.toml`:
//!
//! ```toml
//! database_path = "/home/me/.local/share/teachback/teachback.db"
//! default_user = "me"
//! schedule_days = 14
//! session_max_items = 5
//! progress_days = 30
//! ```
//!
//! Every field is optional. `TEACHBACK_DB` and `TEACHBACK_USER` override
//! the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DB_ENV_VAR: &str = "TEACHBACK_DB";
pub const USER_ENV_VAR: &str = "TEACHBACK_USER";

const APP_DIR: &str = "teachback";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine the {0} directory")]
    DirNotFound(&'static str),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database holding review items and the knowledge graph
    pub database_path: PathBuf,
    /// User whose records the CLI reads and writes
    pub default_user: String,
    /// Days ahead shown by the schedule and upcoming views
    pub schedule_days: u32,
    /// Largest suggested review session
    pub session_max_items: usize,
    /// Days of daily progress shown by the progress view
    pub progress_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path()
                .unwrap_or_else(|_| PathBuf::from("teachback.db")),
            default_user: "default_user".to_string(),
            schedule_days: 7,
            session_max_items: 10,
            progress_days: 30,
        }
    }
}

/// `<data dir>/teachback/teachback.db`
pub fn default_database_path() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|p| p.join(APP_DIR).join("teachback.db"))
        .ok_or(ConfigError::DirNotFound("data"))
}

impl Config {
    /// `<config dir>/teachback/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR).join("config.toml"))
            .ok_or(ConfigError::DirNotFound("config"))
    }

    /// Load from a file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, content).map_err(io_err)
    }

    /// Apply `TEACHBACK_DB` and `TEACHBACK_USER` from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any variable source; empty values are ignored
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(db) = lookup(DB_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            self.database_path = PathBuf::from(db);
        }
        if let Some(user) = lookup(USER_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            self.default_user = user;
        }
        self
    }
}
