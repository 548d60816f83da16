//! Imported completion rows

use crate::error::ImportError;
use acu_common::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Section name denoting the unnamed first section of a course
pub const UNNAMED_SECTION: &str = "0";

/// Course column a row's course value is matched against
///
/// Closed set so column names are never taken from input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseField {
    Id,
    Shortname,
    Idnumber,
    Fullname,
}

impl CourseField {
    pub fn column(self) -> &'static str {
        match self {
            CourseField::Id => "id",
            CourseField::Shortname => "shortname",
            CourseField::Idnumber => "idnumber",
            CourseField::Fullname => "fullname",
        }
    }
}

impl FromStr for CourseField {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(CourseField::Id),
            "shortname" => Ok(CourseField::Shortname),
            "idnumber" => Ok(CourseField::Idnumber),
            "fullname" => Ok(CourseField::Fullname),
            other => Err(ImportError::InvalidConfig(format!(
                "unsupported course field \"{}\" (expected id, shortname, idnumber or fullname)",
                other
            ))),
        }
    }
}

impl fmt::Display for CourseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// User column a row's user value is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserField {
    Id,
    Username,
    Idnumber,
    Email,
}

impl UserField {
    pub fn column(self) -> &'static str {
        match self {
            UserField::Id => "id",
            UserField::Username => "username",
            UserField::Idnumber => "idnumber",
            UserField::Email => "email",
        }
    }
}

impl FromStr for UserField {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(UserField::Id),
            "username" => Ok(UserField::Username),
            "idnumber" => Ok(UserField::Idnumber),
            "email" => Ok(UserField::Email),
            other => Err(ImportError::InvalidConfig(format!(
                "unsupported user field \"{}\" (expected id, username, idnumber or email)",
                other
            ))),
        }
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One completion row to reconcile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub course_field: CourseField,
    pub course_value: String,
    pub user_field: UserField,
    pub user_value: String,
    /// `"0"` selects the unnamed first section
    pub section_name: String,
    /// Matched case-insensitively
    pub activity_name: String,
    /// Unix timestamp stamped onto completion records
    pub completion_date: i64,
}

impl ImportRecord {
    /// Field-presence check run before reconciliation
    pub fn validate(&self) -> acu_common::Result<()> {
        let required = [
            ("course", &self.course_value),
            ("user", &self.user_value),
            ("section", &self.section_name),
            ("activity", &self.activity_name),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::InvalidInput(format!("{} value is empty", name)));
            }
        }

        Ok(())
    }
}
