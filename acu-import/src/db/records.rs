//! Completion and course aggregate records

use acu_common::db::{CompletionRecord, CourseCompletionRecord, CriterionCompletionRecord};
use acu_common::{Error, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::types::RecordStore;

pub struct SqliteRecordStore {
    db: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

fn ensure_updated(rows_affected: u64, table: &str, id: i64) -> Result<()> {
    if rows_affected == 0 {
        return Err(Error::NotFound(format!("{} record {}", table, id)));
    }
    Ok(())
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn get_completion_record(&self, activity_id: i64, user_id: i64) -> Result<Option<CompletionRecord>> {
        let record = sqlx::query_as::<_, CompletionRecord>(
            r#"
            SELECT id, coursemoduleid, userid, completionstate, overrideby, timemodified
            FROM course_modules_completion
            WHERE coursemoduleid = ? AND userid = ? AND completionstate = 1
            "#,
        )
        .bind(activity_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(record)
    }

    async fn update_completion_record(&self, record: &CompletionRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE course_modules_completion
            SET completionstate = ?, overrideby = ?, timemodified = ?
            WHERE id = ?
            "#,
        )
        .bind(record.completionstate)
        .bind(record.overrideby)
        .bind(record.timemodified)
        .bind(record.id)
        .execute(&self.db)
        .await?;

        ensure_updated(result.rows_affected(), "course_modules_completion", record.id)
    }

    async fn get_course_completion(&self, user_id: i64, course_id: i64) -> Result<Option<CourseCompletionRecord>> {
        let record = sqlx::query_as::<_, CourseCompletionRecord>(
            r#"
            SELECT id, userid, course, timeenrolled, timestarted, timecompleted
            FROM course_completions
            WHERE userid = ? AND course = ?
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(record)
    }

    async fn update_course_completion(&self, record: &CourseCompletionRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE course_completions
            SET timeenrolled = ?, timestarted = ?, timecompleted = ?
            WHERE id = ?
            "#,
        )
        .bind(record.timeenrolled)
        .bind(record.timestarted)
        .bind(record.timecompleted)
        .bind(record.id)
        .execute(&self.db)
        .await?;

        ensure_updated(result.rows_affected(), "course_completions", record.id)
    }

    async fn get_criterion_completion(&self, user_id: i64, course_id: i64) -> Result<Option<CriterionCompletionRecord>> {
        let record = sqlx::query_as::<_, CriterionCompletionRecord>(
            r#"
            SELECT id, userid, course, criteriaid, timecompleted
            FROM course_completion_crit_compl
            WHERE userid = ? AND course = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(record)
    }

    async fn update_criterion_completion(&self, record: &CriterionCompletionRecord) -> Result<()> {
        let result = sqlx::query(
            "UPDATE course_completion_crit_compl SET criteriaid = ?, timecompleted = ? WHERE id = ?",
        )
        .bind(record.criteriaid)
        .bind(record.timecompleted)
        .bind(record.id)
        .execute(&self.db)
        .await?;

        ensure_updated(result.rows_affected(), "course_completion_crit_compl", record.id)
    }
}
