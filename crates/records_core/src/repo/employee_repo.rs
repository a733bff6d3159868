//! Read-only view of the `employees` collaborator table.
//!
//! The employee mapper owns this table; reviews only ask whether a key exists.

use crate::repo::review_repo::RepoResult;
use rusqlite::Connection;

/// Primary key of a row in the `employees` table.
pub type EmployeeId = i64;

/// Point-query capability used for referential checks.
pub trait EmployeeDirectory {
    fn employee_exists(&self, id: EmployeeId) -> RepoResult<bool>;
}

/// SQLite-backed employee lookup sharing the application connection.
#[derive(Clone, Copy)]
pub struct SqliteEmployeeDirectory<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEmployeeDirectory<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EmployeeDirectory for SqliteEmployeeDirectory<'_> {
    fn employee_exists(&self, id: EmployeeId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}
