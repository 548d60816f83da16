//! Database models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: i64,
    pub shortname: String,
    pub fullname: String,
    pub idnumber: Option<String>,
    /// Course-level completion tracking switch
    pub enablecompletion: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub idnumber: Option<String>,
    pub email: Option<String>,
    pub firstname: String,
    pub lastname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: i64,
    pub shortname: String,
    pub name: String,
}

/// Account on whose authority completion overrides are made
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub user_id: i64,
    pub username: String,
}

/// A course module resolved within its section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityRef {
    /// Course module id
    pub id: i64,
    pub course: i64,
    pub section_id: i64,
    pub section_number: i64,
    /// None for the unnamed first section
    pub section_name: Option<String>,
    pub name: String,
    /// 0 = tracking disabled, 1 = manual, 2 = automatic
    pub completion: i64,
}

/// Per-activity completion state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionState {
    Incomplete,
    Complete,
}

impl CompletionState {
    /// Stored `completionstate` value
    pub fn as_i64(self) -> i64 {
        match self {
            CompletionState::Incomplete => 0,
            CompletionState::Complete => 1,
        }
    }

    /// Map a stored value
    ///
    /// Only 1 is complete. Pass (2) and fail (3) are graded states that an
    /// override still replaces, so they read as incomplete.
    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => CompletionState::Complete,
            _ => CompletionState::Incomplete,
        }
    }
}

/// Completion state as read through the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionData {
    pub state: CompletionState,
    /// Backing `course_modules_completion` row, if one exists
    pub record_id: Option<i64>,
}

impl CompletionData {
    pub fn incomplete() -> Self {
        Self {
            state: CompletionState::Incomplete,
            record_id: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == CompletionState::Complete
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CompletionRecord {
    pub id: i64,
    pub coursemoduleid: i64,
    pub userid: i64,
    pub completionstate: i64,
    pub overrideby: Option<i64>,
    pub timemodified: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CourseCompletionRecord {
    pub id: i64,
    pub userid: i64,
    pub course: i64,
    pub timeenrolled: i64,
    pub timestarted: i64,
    pub timecompleted: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CriterionCompletionRecord {
    pub id: i64,
    pub userid: i64,
    pub course: i64,
    pub criteriaid: i64,
    pub timecompleted: Option<i64>,
}
