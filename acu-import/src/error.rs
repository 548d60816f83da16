//! Error types for acu-import
//!
//! Only batch-level failures are errors. Row-level failures are reported as
//! [`crate::models::ReconciliationOutcome`] values and never abort a batch.

use thiserror::Error;

/// Batch-level import error
#[derive(Debug, Error)]
pub enum ImportError {
    /// CSV could not be read or decoded
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Header row lacks a required column
    #[error("Missing required column \"{0}\"")]
    MissingColumn(String),

    /// Command line or config value rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// acu-common error
    #[error("Common error: {0}")]
    Common(#[from] acu_common::Error),
}

/// Result type for batch operations
pub type ImportResult<T> = Result<T, ImportError>;
