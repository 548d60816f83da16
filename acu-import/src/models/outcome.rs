//! Reconciliation outcomes and batch summaries

use acu_common::db::{Course, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal classification of one reconciled record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    /// Activity newly marked complete
    Added,
    /// Already complete; completion date corrected
    Updated,
    /// Nothing to do or not permitted
    Skipped,
    /// Failed while applying the record
    Error,
}

/// Result of reconciling one record
///
/// Built once by the reconciler and not changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    pub kind: OutcomeKind,
    /// Always set for skipped and error outcomes
    pub message: Option<String>,
    pub course: Option<Course>,
    pub user: Option<User>,
}

impl ReconciliationOutcome {
    fn new(kind: OutcomeKind, message: Option<String>) -> Self {
        Self {
            kind,
            message,
            course: None,
            user: None,
        }
    }

    pub fn added(message: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Added, Some(message.into()))
    }

    pub fn updated(message: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Updated, Some(message.into()))
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Skipped, Some(message.into()))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Error, Some(message.into()))
    }

    /// Attach the resolved course and user for reporting
    pub fn with_entities(mut self, course: Option<&Course>, user: Option<&User>) -> Self {
        self.course = course.cloned();
        self.user = user.cloned();
        self
    }

    pub fn added_count(&self) -> usize {
        usize::from(self.kind == OutcomeKind::Added)
    }

    pub fn updated_count(&self) -> usize {
        usize::from(self.kind == OutcomeKind::Updated)
    }

    pub fn skipped_count(&self) -> usize {
        usize::from(self.kind == OutcomeKind::Skipped)
    }

    pub fn error_count(&self) -> usize {
        usize::from(self.kind == OutcomeKind::Error)
    }

    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}

/// Per-row line in a batch report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowReport {
    /// 1-based line in the source file (header = 1)
    pub line: u64,
    /// None when the row failed validation
    pub kind: Option<OutcomeKind>,
    pub message: String,
}

/// Totals across a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub run_id: Uuid,
    /// Data rows read
    pub total: usize,
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Rows rejected before reconciliation
    pub invalid: usize,
    pub rows: Vec<RowReport>,
}

impl ImportSummary {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            total: 0,
            added: 0,
            updated: 0,
            skipped: 0,
            errors: 0,
            invalid: 0,
            rows: Vec::new(),
        }
    }

    /// Count one reconciled row
    pub fn record_outcome(&mut self, line: u64, outcome: &ReconciliationOutcome) {
        self.total += 1;
        self.added += outcome.added_count();
        self.updated += outcome.updated_count();
        self.skipped += outcome.skipped_count();
        self.errors += outcome.error_count();
        self.rows.push(RowReport {
            line,
            kind: Some(outcome.kind),
            message: outcome.message().to_string(),
        });
    }

    /// Count one row rejected by validation
    pub fn record_invalid(&mut self, line: u64, reason: impl Into<String>) {
        self.total += 1;
        self.invalid += 1;
        self.rows.push(RowReport {
            line,
            kind: None,
            message: reason.into(),
        });
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        match kind {
            OutcomeKind::Added => self.added,
            OutcomeKind::Updated => self.updated,
            OutcomeKind::Skipped => self.skipped,
            OutcomeKind::Error => self.errors,
        }
    }
}

impl Default for ImportSummary {
    fn default() -> Self {
        Self::new()
    }
}
