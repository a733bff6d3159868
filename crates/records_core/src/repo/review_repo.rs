//! Review mapper contract and SQLite session implementation.
//!
//! # Responsibility
//! - Own the `reviews` table lifecycle (`create_table`/`drop_table`).
//! - Translate save/update/delete/find into parameterized SQL.
//! - Keep one shared in-memory object per stored review (identity map).
//!
//! # Invariants
//! - A handle with `Some(id)` is the identity-map entry for `id`; handles
//!   the session did not register (other sessions, before `reset_session`)
//!   are rejected by `update`/`delete` with `RepoError::ForeignHandle`.
//! - Reads never re-validate stored rows; validation gates writes only.
//! - Outside `unit_of_work` every write auto-commits.
//! - The session is single-threaded (`Rc`/`RefCell`), so it is `!Send`.

use crate::db::migrations::{current_version, latest_version};
use crate::db::{table_exists, DbError};
use crate::model::review::{check_employee, Review, ReviewId, ReviewValidationError};
use crate::repo::employee_repo::{EmployeeId, SqliteEmployeeDirectory};
use crate::repo::identity_map::IdentityMap;
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Deserialize;
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

const REVIEW_SELECT_SQL: &str = "SELECT id, year, summary, employee_id FROM reviews";

const CREATE_REVIEWS_SQL: &str = "CREATE TABLE IF NOT EXISTS reviews (
    id INTEGER PRIMARY KEY,
    year INTEGER,
    summary TEXT,
    employee_id INTEGER,
    FOREIGN KEY (employee_id) REFERENCES employees(id)
);";

/// Shared handle to a mapped review. Two handles for the same stored row
/// satisfy `Rc::ptr_eq`.
pub type SharedReview = Rc<RefCell<Review>>;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for review mapping and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ReviewValidationError),
    Db(DbError),
    NotFound(ReviewId),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    UnitOfWorkActive,
    ForeignHandle(ReviewId),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "review not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection bootstrap version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::UnitOfWorkActive => write!(f, "a unit of work is already active"),
            Self::ForeignHandle(id) => write!(
                f,
                "review {id} is not the object this session holds for that id"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ReviewValidationError> for RepoError {
    fn from(value: ReviewValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// When `employee_id` is checked against the `employees` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceCheck {
    /// Only when the field is assigned. A referenced employee deleted before
    /// `save`/`update` is not detected by the mapper.
    #[default]
    OnAssign,
    /// On assignment and again before every `save`/`update`.
    OnAssignAndWrite,
}

/// Raw stored review in fixed column order: `id, year, summary, employee_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRow {
    pub id: ReviewId,
    pub year: i64,
    pub summary: String,
    pub employee_id: EmployeeId,
}

impl ReviewRow {
    pub fn from_sql_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            year: row.get(1)?,
            summary: row.get(2)?,
            employee_id: row.get(3)?,
        })
    }
}

/// Mapper operations for reviews.
pub trait ReviewRepository {
    /// Ensures the `reviews` table exists. Idempotent.
    fn create_table(&self) -> RepoResult<()>;
    /// Removes the `reviews` table if present. Idempotent.
    fn drop_table(&self) -> RepoResult<()>;
    /// Builds a validated, unpersisted review.
    fn new_review(&self, year: i64, summary: &str, employee_id: EmployeeId)
        -> RepoResult<SharedReview>;
    /// Inserts the review once and returns its primary key.
    fn save(&self, review: &SharedReview) -> RepoResult<ReviewId>;
    /// Maps a stored row, reusing the cached object when one exists.
    fn instance_from_db(&self, row: ReviewRow) -> SharedReview;
    fn find_by_id(&self, id: ReviewId) -> RepoResult<Option<SharedReview>>;
    /// Overwrites the stored row with in-memory values. No-op when unsaved.
    fn update(&self, review: &SharedReview) -> RepoResult<()>;
    /// Deletes the stored row and detaches the review. No-op when unsaved.
    fn delete(&self, review: &SharedReview) -> RepoResult<()>;
    /// Every stored review, in storage scan order.
    fn get_all(&self) -> RepoResult<Vec<SharedReview>>;

    /// Construct + save.
    fn create(&self, year: i64, summary: &str, employee_id: EmployeeId) -> RepoResult<SharedReview> {
        let review = self.new_review(year, summary, employee_id)?;
        self.save(&review)?;
        Ok(review)
    }
}

enum JournalEntry {
    Registered { id: ReviewId, review: SharedReview },
    Evicted { id: ReviewId, review: SharedReview },
}

/// Ends the active unit of work on drop, reverting its journal unless the
/// transaction committed. Runs on early return and on unwind alike.
struct JournalGuard<'repo, 'conn> {
    repo: &'repo SqliteReviewRepository<'conn>,
    committed: bool,
}

impl Drop for JournalGuard<'_, '_> {
    fn drop(&mut self) {
        let journal = self.repo.journal.borrow_mut().take().unwrap_or_default();
        if !self.committed {
            self.repo.revert(journal);
        }
    }
}

/// SQLite-backed review mapper. One instance is one session: its identity
/// map lives exactly as long as the repository value.
pub struct SqliteReviewRepository<'conn> {
    conn: &'conn Connection,
    identity_map: IdentityMap<ReviewId, Review>,
    reference_check: ReferenceCheck,
    journal: RefCell<Option<Vec<JournalEntry>>>,
}

impl<'conn> SqliteReviewRepository<'conn> {
    /// Starts a session on a bootstrapped connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self {
            conn,
            identity_map: IdentityMap::new(),
            reference_check: ReferenceCheck::default(),
            journal: RefCell::new(None),
        })
    }

    pub fn with_reference_check(mut self, reference_check: ReferenceCheck) -> Self {
        self.reference_check = reference_check;
        self
    }

    pub fn reference_check(&self) -> ReferenceCheck {
        self.reference_check
    }

    /// Collaborator lookup sharing this session's connection.
    pub fn employees(&self) -> SqliteEmployeeDirectory<'conn> {
        SqliteEmployeeDirectory::new(self.conn)
    }

    /// Ids currently held by the identity map, ascending.
    pub fn cached_ids(&self) -> Vec<ReviewId> {
        self.identity_map.ids()
    }

    pub fn is_cached(&self, id: ReviewId) -> bool {
        self.identity_map.contains(id)
    }

    /// Forgets every cached object. Later loads build fresh objects, and
    /// handles loaded before the reset are no longer accepted for writes.
    pub fn reset_session(&self) {
        debug!(
            "event=review_session_reset module=repo status=ok cached={}",
            self.identity_map.len()
        );
        self.identity_map.clear();
    }

    /// Runs `work` inside one transaction.
    ///
    /// Commits when `work` returns `Ok`. On `Err`, a failed commit or a panic
    /// inside `work`, the transaction rolls back and ids assigned or cleared
    /// by `save`/`delete`/`drop_table` inside the unit are restored. Field
    /// values the caller changed are left as is.
    pub fn unit_of_work<T>(&self, work: impl FnOnce(&Self) -> RepoResult<T>) -> RepoResult<T> {
        if self.journal.borrow().is_some() {
            return Err(RepoError::UnitOfWorkActive);
        }

        let tx = self.conn.unchecked_transaction()?;
        *self.journal.borrow_mut() = Some(Vec::new());
        let mut journal_guard = JournalGuard {
            repo: self,
            committed: false,
        };

        let value = match work(self) {
            Ok(value) => value,
            Err(err) => {
                warn!("event=review_unit_of_work module=repo status=rolled_back error={err}");
                return Err(err);
            }
        };
        if let Err(err) = tx.commit() {
            warn!("event=review_unit_of_work module=repo status=rolled_back error={err}");
            return Err(err.into());
        }

        journal_guard.committed = true;
        info!("event=review_unit_of_work module=repo status=ok");
        Ok(value)
    }

    fn record(&self, entry: JournalEntry) {
        if let Some(journal) = self.journal.borrow_mut().as_mut() {
            journal.push(entry);
        }
    }

    fn revert(&self, journal: Vec<JournalEntry>) {
        for entry in journal.into_iter().rev() {
            match entry {
                JournalEntry::Registered { id, review } => {
                    self.identity_map.remove(id);
                    review.borrow_mut().set_id(None);
                }
                JournalEntry::Evicted { id, review } => {
                    review.borrow_mut().set_id(Some(id));
                    self.identity_map.insert(id, review);
                }
            }
        }
    }

    /// Rejects handles that are not this session's cached object for their id.
    fn ensure_owned(&self, id: ReviewId, review: &SharedReview) -> RepoResult<()> {
        match self.identity_map.get(id) {
            Some(cached) if Rc::ptr_eq(&cached, review) => Ok(()),
            _ => Err(RepoError::ForeignHandle(id)),
        }
    }

    fn recheck_reference(&self, employee_id: EmployeeId) -> RepoResult<()> {
        match self.reference_check {
            ReferenceCheck::OnAssign => Ok(()),
            ReferenceCheck::OnAssignAndWrite => check_employee(employee_id, &self.employees()),
        }
    }
}

impl ReviewRepository for SqliteReviewRepository<'_> {
    fn create_table(&self) -> RepoResult<()> {
        self.conn.execute_batch(CREATE_REVIEWS_SQL)?;
        debug!("event=review_table_create module=repo status=ok");
        Ok(())
    }

    fn drop_table(&self) -> RepoResult<()> {
        self.conn.execute_batch("DROP TABLE IF EXISTS reviews;")?;

        // Rows are gone, so cached reviews become unpersisted values.
        for id in self.identity_map.ids() {
            if let Some(review) = self.identity_map.remove(id) {
                review.borrow_mut().set_id(None);
                self.record(JournalEntry::Evicted { id, review });
            }
        }
        debug!("event=review_table_drop module=repo status=ok");
        Ok(())
    }

    fn new_review(
        &self,
        year: i64,
        summary: &str,
        employee_id: EmployeeId,
    ) -> RepoResult<SharedReview> {
        let review = Review::new(year, summary, employee_id, &self.employees())?;
        Ok(Rc::new(RefCell::new(review)))
    }

    fn save(&self, review: &SharedReview) -> RepoResult<ReviewId> {
        let existing = review.borrow().id();
        if let Some(id) = existing {
            debug!("event=review_save module=repo status=noop review_id={id}");
            return Ok(id);
        }

        {
            let current = review.borrow();
            self.recheck_reference(current.employee_id())?;
            self.conn.execute(
                "INSERT INTO reviews (year, summary, employee_id) VALUES (?1, ?2, ?3);",
                params![current.year(), current.summary(), current.employee_id()],
            )?;
        }

        let id = self.conn.last_insert_rowid();
        review.borrow_mut().set_id(Some(id));
        self.identity_map.insert(id, Rc::clone(review));
        self.record(JournalEntry::Registered {
            id,
            review: Rc::clone(review),
        });

        info!("event=review_save module=repo status=ok review_id={id}");
        Ok(id)
    }

    fn instance_from_db(&self, row: ReviewRow) -> SharedReview {
        if let Some(cached) = self.identity_map.get(row.id) {
            return cached;
        }

        let id = row.id;
        let review = Rc::new(RefCell::new(Review::from_stored(
            row.id,
            row.year,
            row.summary,
            row.employee_id,
        )));
        self.identity_map.insert(id, Rc::clone(&review));
        review
    }

    fn find_by_id(&self, id: ReviewId) -> RepoResult<Option<SharedReview>> {
        let row = self
            .conn
            .query_row(
                &format!("{REVIEW_SELECT_SQL} WHERE id = ?1;"),
                [id],
                ReviewRow::from_sql_row,
            )
            .optional()?;

        debug!(
            "event=review_find module=repo status=ok review_id={id} found={}",
            row.is_some()
        );
        Ok(row.map(|row| self.instance_from_db(row)))
    }

    fn update(&self, review: &SharedReview) -> RepoResult<()> {
        let current = review.borrow();
        let Some(id) = current.id() else {
            debug!("event=review_update module=repo status=noop");
            return Ok(());
        };

        self.ensure_owned(id, review)?;
        self.recheck_reference(current.employee_id())?;
        let changed = self.conn.execute(
            "UPDATE reviews SET year = ?1, summary = ?2, employee_id = ?3 WHERE id = ?4;",
            params![current.year(), current.summary(), current.employee_id(), id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        info!("event=review_update module=repo status=ok review_id={id}");
        Ok(())
    }

    fn delete(&self, review: &SharedReview) -> RepoResult<()> {
        let existing = review.borrow().id();
        let Some(id) = existing else {
            debug!("event=review_delete module=repo status=noop");
            return Ok(());
        };
        self.ensure_owned(id, review)?;

        let changed = self
            .conn
            .execute("DELETE FROM reviews WHERE id = ?1;", [id])?;
        if changed == 0 {
            warn!("event=review_delete module=repo status=missing_row review_id={id}");
        }

        self.identity_map.remove(id);
        review.borrow_mut().set_id(None);
        self.record(JournalEntry::Evicted {
            id,
            review: Rc::clone(review),
        });

        info!("event=review_delete module=repo status=ok review_id={id}");
        Ok(())
    }

    fn get_all(&self) -> RepoResult<Vec<SharedReview>> {
        let mut stmt = self.conn.prepare(&format!("{REVIEW_SELECT_SQL};"))?;
        let rows = stmt
            .query_map([], ReviewRow::from_sql_row)?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "event=review_list module=repo status=ok count={}",
            rows.len()
        );
        Ok(rows
            .into_iter()
            .map(|row| self.instance_from_db(row))
            .collect())
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "employees")? {
        return Err(RepoError::MissingRequiredTable("employees"));
    }

    Ok(())
}
