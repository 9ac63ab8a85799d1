//! Configuration management for sqldump
//!
//! This module handles loading, parsing, and managing configuration from various sources:
//! - Configuration files (TOML format)
//! - Environment variables
//! - Command-line arguments
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::export::{DEFAULT_CHUNK_SIZE, DEFAULT_QUEUE_CAPACITY, DumpOptions};

/// Environment variable overriding `dump.chunk_size`
pub const ENV_CHUNK_SIZE: &str = "SQLDUMP_CHUNK_SIZE";
/// Environment variable overriding `dump.queue_capacity`
pub const ENV_QUEUE_CAPACITY: &str = "SQLDUMP_QUEUE_CAPACITY";
/// Environment variable overriding `dump.drain_timeout_secs`
pub const ENV_DRAIN_TIMEOUT: &str = "SQLDUMP_DRAIN_TIMEOUT";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Dump tuning
    #[serde(default)]
    pub dump: DumpConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Table to dump (binary only)
    #[serde(default)]
    pub table: Option<TableConfig>,
}

/// Dump-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpConfig {
    /// Accumulator size that triggers a write, in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Chunks that may be queued ahead of the writer
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Seconds to wait for the writer to drain
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,

    /// Backslash escapes in string literals (false for NO_BACKSLASH_ESCAPES)
    #[serde(default = "default_escape_backslash")]
    pub escape_backslash: bool,

    /// Rows per INSERT statement (0 = one statement per table)
    #[serde(default)]
    pub rows_per_statement: usize,

    /// Open the output file only when the first chunk arrives
    #[serde(default)]
    pub lazy_output: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Table description for the row file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name, quoted with backticks on output
    pub name: String,

    /// Columns in row order
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,

    /// Explicit column list, e.g. "(`a`,`b`)"
    #[serde(default)]
    pub selected_field: Option<String>,

    /// Lines written verbatim before the data
    #[serde(default)]
    pub special_comments: Vec<String>,

    /// CREATE statement written to the schema file
    #[serde(default)]
    pub create_sql: Option<String>,
}

/// One column of a table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,

    /// Declared SQL type name, e.g. "VARCHAR" or "BLOB"
    #[serde(rename = "type")]
    pub type_name: String,
}

// Default value functions
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_drain_timeout_secs() -> u64 {
    60
}

fn default_escape_backslash() -> bool {
    true
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            queue_capacity: default_queue_capacity(),
            drain_timeout_secs: default_drain_timeout_secs(),
            escape_backslash: default_escape_backslash(),
            rows_per_statement: 0,
            lazy_output: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        Self::from_toml(&text)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Load configuration from file and environment
    ///
    /// Uses `path` when given, otherwise the default path if that file
    /// exists, otherwise defaults. Environment overrides are applied on top.
    ///
    /// # Returns
    /// * `Result<Config>` - Merged configuration or error
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides
    ///
    /// `lookup` resolves a variable name; unset variables are skipped and
    /// unparsable ones are rejected.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CHUNK_SIZE) {
            self.dump.chunk_size = parse_env(ENV_CHUNK_SIZE, &value)?;
        }
        if let Some(value) = lookup(ENV_QUEUE_CAPACITY) {
            self.dump.queue_capacity = parse_env(ENV_QUEUE_CAPACITY, &value)?;
        }
        if let Some(value) = lookup(ENV_DRAIN_TIMEOUT) {
            self.dump.drain_timeout_secs = parse_env(ENV_DRAIN_TIMEOUT, &value)?;
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - Path to default configuration file
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sqldump")
            .join("config.toml")
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        if self.dump.chunk_size == 0 {
            return Err(invalid("dump.chunk_size", "0"));
        }
        if self.dump.queue_capacity == 0 {
            return Err(invalid("dump.queue_capacity", "0"));
        }
        if self.dump.drain_timeout_secs == 0 {
            return Err(invalid("dump.drain_timeout_secs", "0"));
        }

        if let Some(ref table) = self.table {
            if table.name.trim().is_empty() {
                return Err(invalid("table.name", &table.name));
            }
            if table.columns.is_empty() {
                return Err(ConfigError::MissingField("table.columns".to_string()).into());
            }
        }
        Ok(())
    }

    /// Get drain timeout as Duration
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.dump.drain_timeout_secs)
    }

    /// Dump options derived from `[dump]`
    pub fn dump_options(&self) -> DumpOptions {
        DumpOptions {
            chunk_size: self.dump.chunk_size,
            queue_capacity: self.dump.queue_capacity,
            drain_timeout: self.drain_timeout(),
        }
    }
}

impl TableConfig {
    /// Declared column types, in row order
    pub fn column_types(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.type_name.clone()).collect()
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn invalid(field: &str, value: &str) -> crate::error::DumpError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const SAMPLE: &str = r#"
[dump]
chunk_size = 4096
rows_per_statement = 100

[logging]
level = "debug"

[table]
name = "users"
selected_field = "(`id`,`name`)"
special_comments = ["/*!40101 SET NAMES binary*/;"]
create_sql = "CREATE TABLE `users` (`id` INT, `name` TEXT)"

[[table.columns]]
name = "id"
type = "INT"

[[table.columns]]
name = "name"
type = "TEXT"
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dump.chunk_size, 1_048_576);
        assert_eq!(config.dump.queue_capacity, 8);
        assert_eq!(config.drain_timeout(), Duration::from_secs(60));
        assert!(config.dump.escape_backslash);
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert!(config.table.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config = Config::from_toml(SAMPLE).unwrap();
        assert_eq!(config.dump.chunk_size, 4096);
        assert_eq!(config.dump.queue_capacity, 8);
        assert_eq!(config.dump.rows_per_statement, 100);
        assert_eq!(config.logging.level.to_tracing_level(), tracing::Level::DEBUG);

        let table = config.table.as_ref().unwrap();
        assert_eq!(table.name, "users");
        assert_eq!(table.column_types(), vec!["INT", "TEXT"]);
        assert_eq!(table.special_comments.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.dump.chunk_size, 4096);

        let err = Config::from_file("/nonexistent/sqldump.toml").unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml("[dump]\nchunk_size = \"big\"").unwrap_err();
        assert!(err.to_string().contains("Invalid config format"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(ENV_CHUNK_SIZE, "512"), (ENV_DRAIN_TIMEOUT, " 5 ")]
            .into_iter()
            .collect();
        let mut config = Config::from_toml(SAMPLE).unwrap();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.dump.chunk_size, 512);
        assert_eq!(config.dump.queue_capacity, 8);
        assert_eq!(config.dump_options().drain_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_env_rejects_garbage() {
        let mut config = Config::default();
        let err = config
            .apply_env(|key| (key == ENV_QUEUE_CAPACITY).then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_QUEUE_CAPACITY));
    }

    #[test]
    fn test_validate_rejects_zero_and_empty() {
        let mut config = Config::default();
        config.dump.chunk_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dump.drain_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::from_toml(SAMPLE).unwrap();
        if let Some(table) = config.table.as_mut() {
            table.columns.clear();
        }
        assert!(config.validate().is_err());

        let mut config = Config::from_toml(SAMPLE).unwrap();
        if let Some(table) = config.table.as_mut() {
            table.name = " ".to_string();
        }
        assert!(config.validate().is_err());
    }
}
