//! Manual enrolment

use acu_common::time::now_timestamp;
use acu_common::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::types::EnrollmentService;

/// Enrolment plugin used for imported users
const MANUAL_ENROL: &str = "manual";

pub struct SqliteEnrollmentService {
    db: SqlitePool,
}

impl SqliteEnrollmentService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EnrollmentService for SqliteEnrollmentService {
    /// Enrol through the course's manual instance, creating it if missing
    ///
    /// A disabled manual instance leaves the user unenrolled.
    async fn ensure_enrolled(&self, course_id: i64, user_id: i64, role_id: i64) -> Result<()> {
        let mut tx = self.db.begin().await?;
        let now = now_timestamp();

        sqlx::query("INSERT OR IGNORE INTO enrol (courseid, enrol, status) VALUES (?, ?, 0)")
            .bind(course_id)
            .bind(MANUAL_ENROL)
            .execute(&mut *tx)
            .await?;

        let (enrol_id, status): (i64, i64) =
            sqlx::query_as("SELECT id, status FROM enrol WHERE courseid = ? AND enrol = ?")
                .bind(course_id)
                .bind(MANUAL_ENROL)
                .fetch_one(&mut *tx)
                .await?;

        if status != 0 {
            warn!(course_id, "Manual enrolment disabled for course, user not enrolled");
            tx.commit().await?;
            return Ok(());
        }

        let enrolled = sqlx::query(
            "INSERT OR IGNORE INTO user_enrolments (enrolid, userid, status, timecreated) VALUES (?, ?, 0, ?)",
        )
        .bind(enrol_id)
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            "INSERT OR IGNORE INTO role_assignments (roleid, userid, courseid, timemodified) VALUES (?, ?, ?, ?)",
        )
        .bind(role_id)
        .bind(user_id)
        .bind(course_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if enrolled > 0 {
            debug!(course_id, user_id, role_id, "User enrolled");
        }

        Ok(())
    }
}
