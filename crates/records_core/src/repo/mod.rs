//! Repository layer: mappers and their persistence implementations.
//!
//! # Responsibility
//! - Translate mapper operations into parameterized SQL.
//! - Own per-session identity maps.
//!
//! # Invariants
//! - Field validation happens on assignment, before any SQL mutation.
//! - Absence is reported as `Ok(None)`; storage errors propagate unchanged.

pub mod employee_repo;
pub mod identity_map;
pub mod review_repo;
