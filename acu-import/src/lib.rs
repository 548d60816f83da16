//! acu-import library interface
//!
//! Bulk-marks learning activities complete from imported rows. The
//! [`services::Reconciler`] decides per row whether to add, update, skip or
//! report an error, working only through the collaborator traits in
//! [`types`]. SQLite-backed collaborators live in [`db`].

pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod types;
pub mod utils;

pub use crate::error::{ImportError, ImportResult};
pub use crate::models::{ImportRecord, ImportSummary, OutcomeKind, ReconciliationOutcome};
pub use crate::services::Reconciler;
pub use crate::utils::PollPolicy;
