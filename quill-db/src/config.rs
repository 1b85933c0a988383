//! Database configuration.
//!
//! Read from `~/.quill/config.toml` (or an explicit path), then overridden by
//! environment variables:
//!
//! ```toml
//! [database]
//! path = "~/.quill/quill.db"
//! busy_timeout_ms = 5000
//! create_if_missing = true
//! slow_statement_ms = 100
//! ```
//!
//! | Variable                  | Field               |
//! |---------------------------|---------------------|
//! | `QUILL_DATABASE_PATH`     | `path`              |
//! | `QUILL_BUSY_TIMEOUT_MS`   | `busy_timeout_ms`   |
//! | `QUILL_SLOW_STATEMENT_MS` | `slow_statement_ms` |

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::sqlite::DEFAULT_BUSY_TIMEOUT;
use crate::driver::SqliteConnector;
use crate::engine::{self, Engine, EngineOptions, DEFAULT_SLOW_STATEMENT_THRESHOLD};
use crate::error::{DbError, Result};

pub const ENV_DATABASE_PATH: &str = "QUILL_DATABASE_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "QUILL_BUSY_TIMEOUT_MS";
pub const ENV_SLOW_STATEMENT_MS: &str = "QUILL_SLOW_STATEMENT_MS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuillConfig {
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
    pub create_if_missing: bool,
    pub slow_statement_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("quill.db"),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT.as_millis() as u64,
            create_if_missing: true,
            slow_statement_ms: DEFAULT_SLOW_STATEMENT_THRESHOLD.as_millis() as u64,
        }
    }
}

impl QuillConfig {
    /// Load the default config file if it exists (defaults otherwise), then
    /// apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let mut config = if path.exists() {
            Self::read_file(&path)?
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load an explicit config file (which must exist), then apply
    /// environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DbError::config(format!(
                "config not found at {}",
                path.display()
            )));
        }
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Config file path: ~/.quill/config.toml
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".quill/config.toml")
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)
            .map_err(|err| DbError::config(format!("invalid TOML: {}", err)))?;
        config.database.path = expand_home(&config.database.path);
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|err| DbError::config(format!("failed to serialize config: {}", err)))
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the process environment in
    /// production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let db = &mut self.database;

        if let Some(path) = lookup(ENV_DATABASE_PATH).filter(|p| !p.is_empty()) {
            db.path = expand_home(Path::new(&path));
        }
        if let Some(raw) = lookup(ENV_BUSY_TIMEOUT_MS) {
            db.busy_timeout_ms = parse_millis(ENV_BUSY_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SLOW_STATEMENT_MS) {
            db.slow_statement_ms = parse_millis(ENV_SLOW_STATEMENT_MS, &raw)?;
        }
        Ok(())
    }

    fn read_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|err| {
            DbError::config(format!("failed to read {}: {}", path.display(), err))
        })?;
        Self::from_toml_str(&content)
    }
}

impl DatabaseConfig {
    pub fn connector(&self) -> SqliteConnector {
        SqliteConnector::new(&self.path)
            .with_busy_timeout(Duration::from_millis(self.busy_timeout_ms))
            .create_if_missing(self.create_if_missing)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            slow_statement_threshold: Duration::from_millis(self.slow_statement_ms),
        }
    }

    /// An engine for this database, not registered globally.
    pub fn build_engine(&self) -> Engine {
        Engine::new(self.connector(), self.engine_options())
    }

    /// Register the process-global engine for this database.
    pub fn create_engine(&self) -> Result<Engine> {
        engine::create_engine(self.connector(), self.engine_options())
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| DbError::config(format!("{} must be a number of milliseconds, got '{}'", key, raw)))
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
