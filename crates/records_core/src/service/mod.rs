//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate mapper calls into use-case level APIs.
//! - Keep callers decoupled from storage details.

pub mod review_service;
