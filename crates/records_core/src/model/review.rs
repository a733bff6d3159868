//! Review domain model.
//!
//! # Responsibility
//! - Hold one performance review and its employee reference.
//! - Validate every field when it is assigned, before any write can happen.
//!
//! # Invariants
//! - `id` is `None` iff the review has never been persisted (or was deleted).
//! - `year >= MIN_REVIEW_YEAR`.
//! - `summary` is non-empty.
//! - `employee_id` named an existing employee when it was assigned.

use crate::repo::employee_repo::{EmployeeDirectory, EmployeeId};
use crate::repo::review_repo::{RepoError, RepoResult};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Primary key of a stored review row.
pub type ReviewId = i64;

/// Earliest accepted review year.
pub const MIN_REVIEW_YEAR: i64 = 2000;

/// Field-level validation failure raised by review setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewValidationError {
    YearOutOfRange { year: i64 },
    EmptySummary,
    UnknownEmployee(EmployeeId),
}

impl Display for ReviewValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::YearOutOfRange { year } => {
                write!(f, "year must be >= {MIN_REVIEW_YEAR}, got {year}")
            }
            Self::EmptySummary => write!(f, "summary must be a non-empty string"),
            Self::UnknownEmployee(id) => {
                write!(f, "employee_id {id} does not reference an existing employee")
            }
        }
    }
}

impl Error for ReviewValidationError {}

/// One performance review mapped to a row of the `reviews` table.
///
/// Fields are private so every assignment goes through a validating setter.
/// Not `Clone`: a copy carrying `Some(id)` would be a second object for one row.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Review {
    id: Option<ReviewId>,
    year: i64,
    summary: String,
    employee_id: EmployeeId,
}

impl Review {
    /// Builds an unpersisted review, validating `year`, `summary` and
    /// `employee_id` in that order.
    ///
    /// # Errors
    /// - `RepoError::Validation` for the first invalid field.
    /// - `RepoError::Db` when the employee lookup itself fails.
    pub fn new(
        year: i64,
        summary: impl Into<String>,
        employee_id: EmployeeId,
        employees: &dyn EmployeeDirectory,
    ) -> RepoResult<Self> {
        let year = check_year(year)?;
        let summary = check_summary(summary.into())?;
        check_employee(employee_id, employees)?;

        Ok(Self {
            id: None,
            year,
            summary,
            employee_id,
        })
    }

    /// Rebuilds a review from stored values without validation.
    ///
    /// Validation gates writes only; stored rows are trusted.
    pub(crate) fn from_stored(
        id: ReviewId,
        year: i64,
        summary: String,
        employee_id: EmployeeId,
    ) -> Self {
        Self {
            id: Some(id),
            year,
            summary,
            employee_id,
        }
    }

    pub fn id(&self) -> Option<ReviewId> {
        self.id
    }

    pub fn year(&self) -> i64 {
        self.year
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn employee_id(&self) -> EmployeeId {
        self.employee_id
    }

    /// Returns whether this review currently maps to a stored row.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Replaces `year`; the previous value is kept on failure.
    pub fn set_year(&mut self, year: i64) -> Result<(), ReviewValidationError> {
        self.year = check_year(year)?;
        Ok(())
    }

    /// Replaces `summary`; the previous value is kept on failure.
    pub fn set_summary(&mut self, summary: impl Into<String>) -> Result<(), ReviewValidationError> {
        self.summary = check_summary(summary.into())?;
        Ok(())
    }

    /// Replaces `employee_id` after a point lookup against `employees`.
    ///
    /// Assignment can fail because of external state, not only shape.
    pub fn set_employee_id(
        &mut self,
        employee_id: EmployeeId,
        employees: &dyn EmployeeDirectory,
    ) -> RepoResult<()> {
        check_employee(employee_id, employees)?;
        self.employee_id = employee_id;
        Ok(())
    }

    /// Validates every supplied field, then assigns them together.
    ///
    /// Returns the replaced `(year, summary)` so a failed write can undo it.
    pub(crate) fn replace_fields(
        &mut self,
        year: Option<i64>,
        summary: Option<&str>,
    ) -> Result<(i64, String), ReviewValidationError> {
        let year = year.map(check_year).transpose()?.unwrap_or(self.year);
        let summary = match summary {
            Some(summary) => check_summary(summary.to_owned())?,
            None => self.summary.clone(),
        };
        Ok((
            std::mem::replace(&mut self.year, year),
            std::mem::replace(&mut self.summary, summary),
        ))
    }

    /// Puts back values returned by [`Review::replace_fields`].
    pub(crate) fn restore_fields(&mut self, year: i64, summary: String) {
        self.year = year;
        self.summary = summary;
    }

    pub(crate) fn set_id(&mut self, id: Option<ReviewId>) {
        self.id = id;
    }
}

impl Display for Review {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "<Review {id}: ")?,
            None => write!(f, "<Review None: ")?,
        }
        write!(
            f,
            "{}, {}, Employee: {}>",
            self.year, self.summary, self.employee_id
        )
    }
}

fn check_year(year: i64) -> Result<i64, ReviewValidationError> {
    if year < MIN_REVIEW_YEAR {
        return Err(ReviewValidationError::YearOutOfRange { year });
    }
    Ok(year)
}

fn check_summary(summary: String) -> Result<String, ReviewValidationError> {
    if summary.is_empty() {
        return Err(ReviewValidationError::EmptySummary);
    }
    Ok(summary)
}

pub(crate) fn check_employee(
    employee_id: EmployeeId,
    employees: &dyn EmployeeDirectory,
) -> RepoResult<()> {
    if !employees.employee_exists(employee_id)? {
        return Err(RepoError::Validation(
            ReviewValidationError::UnknownEmployee(employee_id),
        ));
    }
    Ok(())
}
