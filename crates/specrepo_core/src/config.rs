//! Runtime configuration for backends and logging.
//!
//! # Responsibility
//! - Describe which backend a process uses and how it flushes.
//! - Load that description from JSON.
//!
//! # Invariants
//! - Missing flush modes fall back to the backend default
//!   (`auto` for SQLite, `explicit` for memory).

use crate::logging::default_log_level;
use crate::unit_of_work::FlushMode;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// SQLite session backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database file shared by every session of a factory.
    pub path: PathBuf,
    #[serde(default = "sqlite_flush_mode")]
    pub flush_mode: FlushMode,
}

impl SqliteConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            flush_mode: sqlite_flush_mode(),
        }
    }

    pub fn with_flush_mode(mut self, flush_mode: FlushMode) -> Self {
        self.flush_mode = flush_mode;
        self
    }
}

/// In-memory session backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "memory_flush_mode")]
    pub flush_mode: FlushMode,
}

impl MemoryConfig {
    pub fn with_flush_mode(mut self, flush_mode: FlushMode) -> Self {
        self.flush_mode = flush_mode;
        self
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            flush_mode: memory_flush_mode(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Sqlite(SqliteConfig),
    Memory(MemoryConfig),
}

/// Logging settings; no directory means stderr.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RepoConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

fn sqlite_flush_mode() -> FlushMode {
    FlushMode::Auto
}

fn memory_flush_mode() -> FlushMode {
    FlushMode::Explicit
}

fn default_level() -> String {
    default_log_level().to_string()
}

#[cfg(test)]
mod tests {
    use super::{BackendConfig, ConfigError, RepoConfig};
    use crate::unit_of_work::FlushMode;
    use std::path::PathBuf;

    #[test]
    fn sqlite_backend_defaults_to_auto_flush() {
        let config =
            RepoConfig::from_json_str(r#"{"backend":{"kind":"sqlite","path":"/tmp/app.db"}}"#)
                .unwrap();
        match config.backend {
            BackendConfig::Sqlite(sqlite) => {
                assert_eq!(sqlite.path, PathBuf::from("/tmp/app.db"));
                assert_eq!(sqlite.flush_mode, FlushMode::Auto);
            }
            other => panic!("unexpected backend: {other:?}"),
        }
        assert!(config.logging.dir.is_none());
    }

    #[test]
    fn memory_backend_defaults_to_explicit_flush() {
        let config = RepoConfig::from_json_str(
            r#"{"backend":{"kind":"memory"},"logging":{"level":"warn","dir":"/var/log/app"}}"#,
        )
        .unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Memory(super::MemoryConfig {
                flush_mode: FlushMode::Explicit
            })
        );
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.dir, Some(PathBuf::from("/var/log/app")));
    }

    #[test]
    fn flush_mode_can_be_overridden() {
        let config = RepoConfig::from_json_str(
            r#"{"backend":{"kind":"memory","flush_mode":"auto"}}"#,
        )
        .unwrap();
        assert!(matches!(
            config.backend,
            BackendConfig::Memory(memory) if memory.flush_mode == FlushMode::Auto
        ));
    }

    #[test]
    fn unknown_backend_is_a_parse_error() {
        let err = RepoConfig::from_json_str(r#"{"backend":{"kind":"oracle"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo.json");
        std::fs::write(&path, r#"{"backend":{"kind":"memory"}}"#).unwrap();

        let config = RepoConfig::load(&path).unwrap();
        assert!(matches!(config.backend, BackendConfig::Memory(_)));

        let missing = RepoConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }
}
