//! Runtime configuration for the records core.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.
//! - `database_path = None` selects an in-memory database.

use crate::db::{open_db_with, DbError};
use crate::logging::{init_logging, LogLevel, LoggingError};
use crate::repo::review_repo::{ReferenceCheck, RepoError, SqliteReviewRepository};
use rusqlite::Connection;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Db(DbError),
    Repo(RepoError),
    Logging(LoggingError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid configuration: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Logging(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<DbError> for ConfigError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for ConfigError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<LoggingError> for ConfigError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

/// Log sink settings. `level` falls back to the build default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: Option<String>,
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub database_path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    pub reference_check: ReferenceCheck,
    pub logging: Option<LoggingConfig>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            reference_check: ReferenceCheck::default(),
            logging: None,
        }
    }
}

impl CoreConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Starts file logging when a `logging` section is present.
    pub fn init_logging(&self) -> Result<(), ConfigError> {
        let Some(logging) = &self.logging else {
            return Ok(());
        };
        let level = match logging.level.as_deref() {
            Some(raw) => raw.parse::<LogLevel>()?,
            None => LogLevel::build_default(),
        };
        init_logging(level, &logging.dir)?;
        Ok(())
    }

    /// Opens and bootstraps the shared connection.
    pub fn open_connection(&self) -> Result<Connection, ConfigError> {
        let conn = open_db_with(
            self.database_path.as_deref(),
            Duration::from_millis(self.busy_timeout_ms),
        )?;
        Ok(conn)
    }

    /// Starts a review session on `conn` with the configured reference policy.
    pub fn open_repository<'conn>(
        &self,
        conn: &'conn Connection,
    ) -> Result<SqliteReviewRepository<'conn>, ConfigError> {
        let repo = SqliteReviewRepository::try_new(conn)?.with_reference_check(self.reference_check);
        Ok(repo)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use crate::repo::review_repo::ReferenceCheck;
    use std::path::PathBuf;

    #[test]
    fn empty_object_uses_defaults() {
        let config = CoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.busy_timeout_ms, 5_000);
        assert_eq!(config.reference_check, ReferenceCheck::OnAssign);
    }

    #[test]
    fn parses_all_sections() {
        let config = CoreConfig::from_json_str(
            r#"{
                "database_path": "/tmp/company.db",
                "busy_timeout_ms": 250,
                "reference_check": "on_assign_and_write",
                "logging": { "level": "warn", "dir": "/tmp/records-logs" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/company.db")));
        assert_eq!(config.busy_timeout_ms, 250);
        assert_eq!(config.reference_check, ReferenceCheck::OnAssignAndWrite);
        let logging = config.logging.unwrap();
        assert_eq!(logging.level.as_deref(), Some("warn"));
        assert_eq!(logging.dir, PathBuf::from("/tmp/records-logs"));
    }

    #[test]
    fn unknown_reference_check_is_a_parse_error() {
        let err = CoreConfig::from_json_str(r#"{"reference_check": "never"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn bad_log_level_is_rejected_before_touching_the_sink() {
        let config = CoreConfig::from_json_str(
            r#"{"logging": {"level": "loud", "dir": "/tmp/records-logs"}}"#,
        )
        .unwrap();
        assert!(matches!(config.init_logging(), Err(ConfigError::Logging(_))));
    }

    #[test]
    fn in_memory_config_opens_a_ready_repository() {
        let config = CoreConfig {
            reference_check: ReferenceCheck::OnAssignAndWrite,
            ..CoreConfig::default()
        };
        let conn = config.open_connection().unwrap();
        let repo = config.open_repository(&conn).unwrap();
        assert_eq!(repo.reference_check(), ReferenceCheck::OnAssignAndWrite);
    }
}
