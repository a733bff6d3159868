//! Core persistence logic for the company records application.
//! This crate maps performance reviews onto the `reviews` table.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, LoggingConfig};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::review::{Review, ReviewId, ReviewValidationError, MIN_REVIEW_YEAR};
pub use repo::employee_repo::{EmployeeDirectory, EmployeeId, SqliteEmployeeDirectory};
pub use repo::identity_map::IdentityMap;
pub use repo::review_repo::{
    ReferenceCheck, RepoError, RepoResult, ReviewRepository, ReviewRow, SharedReview,
    SqliteReviewRepository,
};
pub use service::review_service::{ReviewRevision, ReviewService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
