//! Admin client for a sports league REST backend.
//!
//! The interesting parts are [`infrastructure::executor::RequestExecutor`],
//! which de-duplicates and caches backend reads, and
//! [`application::classifier::ErrorClassifier`], which turns any failure into
//! an [`domain::app_error::AppError`].

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod presentation;
pub mod state;
