//! CSV batch import
//!
//! Reads completion rows, validates each, reconciles them one at a time and
//! accumulates an [`ImportSummary`]. Rows never affect each other: a failed
//! or undecodable row is counted and the batch moves on. Only a bad header
//! or an IO failure ends the batch.
//!
//! Required header columns (any order, case-insensitive):
//! `course`, `user`, `section`, `activity`, `completiondate`.

use acu_common::db::{Operator, Role};
use acu_common::time::parse_completion_date;
use csv::StringRecord;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{ImportError, ImportResult};
use crate::models::{CourseField, ImportRecord, ImportSummary, UserField};
use crate::services::Reconciler;

const REQUIRED_COLUMNS: [&str; 5] = ["course", "user", "section", "activity", "completiondate"];

/// How rows are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub course_field: CourseField,
    pub user_field: UserField,
    pub delimiter: u8,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            course_field: CourseField::Shortname,
            user_field: UserField::Username,
            delimiter: b',',
        }
    }
}

/// Column positions of the required fields
struct ColumnMap {
    course: usize,
    user: usize,
    section: usize,
    activity: usize,
    completion_date: usize,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> ImportResult<Self> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| ImportError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            course: position(REQUIRED_COLUMNS[0])?,
            user: position(REQUIRED_COLUMNS[1])?,
            section: position(REQUIRED_COLUMNS[2])?,
            activity: position(REQUIRED_COLUMNS[3])?,
            completion_date: position(REQUIRED_COLUMNS[4])?,
        })
    }
}

/// Processes a whole file against one reconciler
pub struct BatchImporter {
    reconciler: Reconciler,
    role: Option<Role>,
    operator: Operator,
    options: BatchOptions,
}

impl BatchImporter {
    pub fn new(
        reconciler: Reconciler,
        role: Option<Role>,
        operator: Operator,
        options: BatchOptions,
    ) -> Self {
        Self {
            reconciler,
            role,
            operator,
            options,
        }
    }

    pub async fn import_path(&self, path: &Path) -> ImportResult<ImportSummary> {
        let file = std::fs::File::open(path)?;
        info!("Importing completions from {}", path.display());
        self.import_reader(file).await
    }

    pub async fn import_reader<R: Read>(&self, source: R) -> ImportResult<ImportSummary> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(source);

        let columns = ColumnMap::from_headers(reader.headers()?)?;
        let mut summary = ImportSummary::new();

        for result in reader.records() {
            let row = match result {
                Ok(row) => row,
                Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(0);
                    warn!(line, run_id = %summary.run_id, "Row unreadable: {}", e);
                    summary.record_invalid(line, e.to_string());
                    continue;
                }
            };
            let line = row.position().map(|p| p.line()).unwrap_or(0);

            let record = match self.build_record(&row, &columns) {
                Ok(record) => record,
                Err(reason) => {
                    warn!(line, run_id = %summary.run_id, "Row rejected: {}", reason);
                    summary.record_invalid(line, reason);
                    continue;
                }
            };

            let outcome = self
                .reconciler
                .reconcile(&record, self.role.as_ref(), &self.operator)
                .await;
            summary.record_outcome(line, &outcome);
        }

        info!(
            run_id = %summary.run_id,
            total = summary.total,
            added = summary.added,
            updated = summary.updated,
            skipped = summary.skipped,
            errors = summary.errors,
            invalid = summary.invalid,
            "Import finished"
        );

        Ok(summary)
    }

    /// Map a CSV row to a validated record; Err carries the rejection reason
    fn build_record(&self, row: &StringRecord, columns: &ColumnMap) -> Result<ImportRecord, String> {
        let cell = |index: usize| row.get(index).unwrap_or("").to_string();

        let completion_date =
            parse_completion_date(&cell(columns.completion_date)).map_err(|e| e.to_string())?;

        let record = ImportRecord {
            course_field: self.options.course_field,
            course_value: cell(columns.course),
            user_field: self.options.user_field,
            user_value: cell(columns.user),
            section_name: cell(columns.section),
            activity_name: cell(columns.activity),
            completion_date,
        };

        record.validate().map_err(|e| e.to_string())?;
        Ok(record)
    }
}
