//! SQLite storage bootstrap for the records core.
//!
//! # Responsibility
//! - Open and configure the single connection shared by every mapper.
//! - Bootstrap the collaborator tables (`departments`, `employees`) the
//!   review mapper consults for referential checks.
//!
//! # Invariants
//! - Bootstrap version is tracked via `PRAGMA user_version`.
//! - Mappers must not touch application data before bootstrap succeeds.
//! - The `reviews` table is owned by its mapper (`create_table`/`drop_table`),
//!   not by the bootstrap.

use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_db_with, DEFAULT_BUSY_TIMEOUT};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was bootstrapped by a newer build that knows more
    /// collaborator tables than this one.
    BootstrapTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::BootstrapTooNew { found, supported } => write!(
                f,
                "collaborator tables were bootstrapped at version {found}; this build only knows up to {supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::BootstrapTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Returns whether `conn` has a table named `name`.
pub fn table_exists(conn: &Connection, name: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [name],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
