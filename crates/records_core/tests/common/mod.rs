#![allow(dead_code)]

use records_core::db::open_db_in_memory;
use rusqlite::{params, Connection};

/// In-memory connection with the collaborator tables bootstrapped.
pub fn open_conn() -> Connection {
    open_db_in_memory().unwrap()
}

/// Inserts one employee row and returns its id.
pub fn seed_employee(conn: &Connection, name: &str) -> i64 {
    conn.execute(
        "INSERT INTO employees (name, job_title) VALUES (?1, ?2);",
        params![name, "Engineer"],
    )
    .unwrap();
    conn.last_insert_rowid()
}

pub fn review_row_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM reviews;", [], |row| row.get(0))
        .unwrap()
}
