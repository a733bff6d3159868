//! Review use-case service.
//!
//! # Invariants
//! - Service APIs never bypass mapper validation or identity-map contracts.
//! - Service layer remains storage-agnostic.

use crate::model::review::ReviewId;
use crate::repo::employee_repo::EmployeeId;
use crate::repo::review_repo::{RepoError, RepoResult, ReviewRepository, SharedReview};

/// Partial edit applied by [`ReviewService::revise_review`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewRevision {
    pub year: Option<i64>,
    pub summary: Option<String>,
}

/// Use-case wrapper over any review mapper.
pub struct ReviewService<R: ReviewRepository> {
    repo: R,
}

impl<R: ReviewRepository> ReviewService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Validates and persists a new review.
    pub fn record_review(
        &self,
        year: i64,
        summary: &str,
        employee_id: EmployeeId,
    ) -> RepoResult<SharedReview> {
        self.repo.create(year, summary, employee_id)
    }

    pub fn get_review(&self, id: ReviewId) -> RepoResult<Option<SharedReview>> {
        self.repo.find_by_id(id)
    }

    pub fn list_reviews(&self) -> RepoResult<Vec<SharedReview>> {
        self.repo.get_all()
    }

    /// Applies `revision` to a stored review and writes it back.
    ///
    /// # Contract
    /// - Returns `RepoError::NotFound` when `id` has no row.
    /// - All fields are validated before any is assigned, so a rejected
    ///   revision leaves the review untouched.
    /// - When the write fails the previous field values are restored.
    pub fn revise_review(&self, id: ReviewId, revision: &ReviewRevision) -> RepoResult<SharedReview> {
        let review = self.repo.find_by_id(id)?.ok_or(RepoError::NotFound(id))?;

        let (previous_year, previous_summary) = review
            .borrow_mut()
            .replace_fields(revision.year, revision.summary.as_deref())?;
        if let Err(err) = self.repo.update(&review) {
            review
                .borrow_mut()
                .restore_fields(previous_year, previous_summary);
            return Err(err);
        }

        Ok(review)
    }

    /// Deletes the review stored under `id`. Returns `false` when absent.
    pub fn retract_review(&self, id: ReviewId) -> RepoResult<bool> {
        match self.repo.find_by_id(id)? {
            Some(review) => {
                self.repo.delete(&review)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
