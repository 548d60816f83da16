//! Course, user and activity lookup

use acu_common::db::{ActivityRef, Course, User};
use acu_common::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::models::import_record::UNNAMED_SECTION;
use crate::models::{CourseField, UserField};
use crate::types::ActivityLocator;

pub struct SqliteActivityLocator {
    db: SqlitePool,
}

impl SqliteActivityLocator {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Section label match
///
/// `"0"` also selects the unnamed first section. Comparison is ASCII
/// case-insensitive.
pub fn section_matches(wanted: &str, actual: Option<&str>) -> bool {
    match actual {
        None => wanted == UNNAMED_SECTION,
        Some(name) => name.eq_ignore_ascii_case(wanted),
    }
}

/// Keep only a single match; zero or several means unresolved
fn single<T>(mut rows: Vec<T>) -> Option<T> {
    if rows.len() == 1 {
        rows.pop()
    } else {
        None
    }
}

#[async_trait]
impl ActivityLocator for SqliteActivityLocator {
    async fn find_course_by_field(&self, field: CourseField, value: &str) -> Result<Option<Course>> {
        // Column comes from a closed enum, never from input
        let sql = format!(
            "SELECT id, shortname, fullname, idnumber, enablecompletion FROM courses WHERE {} = ? LIMIT 2",
            field.column()
        );
        let rows = sqlx::query_as::<_, Course>(&sql)
            .bind(value)
            .fetch_all(&self.db)
            .await?;

        if rows.len() > 1 {
            tracing::debug!(field = %field, value, "Course lookup is ambiguous");
        }
        Ok(single(rows))
    }

    async fn find_user_by_field(&self, field: UserField, value: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT id, username, idnumber, email, firstname, lastname FROM users WHERE {} = ? LIMIT 2",
            field.column()
        );
        let rows = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_all(&self.db)
            .await?;

        if rows.len() > 1 {
            tracing::debug!(field = %field, value, "User lookup is ambiguous");
        }
        Ok(single(rows))
    }

    async fn find_activity(
        &self,
        course: &Course,
        section_name: &str,
        activity_name: &str,
    ) -> Result<Option<ActivityRef>> {
        let modules = sqlx::query_as::<_, ActivityRef>(
            r#"
            SELECT cm.id, cm.course, cs.id AS section_id, cs.section AS section_number,
                   cs.name AS section_name, cm.name, cm.completion
            FROM course_modules cm
            JOIN course_sections cs ON cs.id = cm.section
            WHERE cm.course = ?
            ORDER BY cs.section, cm.id
            "#,
        )
        .bind(course.id)
        .fetch_all(&self.db)
        .await?;

        Ok(modules.into_iter().find(|m| {
            section_matches(section_name, m.section_name.as_deref())
                && m.name.eq_ignore_ascii_case(activity_name)
        }))
    }
}
