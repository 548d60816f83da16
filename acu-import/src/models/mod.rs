//! Data models for acu-import

pub mod import_record;
pub mod outcome;

pub use import_record::{CourseField, ImportRecord, UserField};
pub use outcome::{ImportSummary, OutcomeKind, ReconciliationOutcome, RowReport};
