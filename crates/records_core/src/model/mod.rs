//! Domain model for the records core.
//!
//! # Responsibility
//! - Define the in-memory shape of mapped entities.
//! - Enforce field-level domain constraints at assignment time.
//!
//! # Invariants
//! - A model value never holds a field that failed validation.
//! - Primary keys are assigned by storage, never chosen by callers.

pub mod review;
