//! Completion tracking with a per-process state cache
//!
//! State reads go through the cache. A transition evicts only the affected
//! (activity, user) entry, so readers that cached state elsewhere see stale
//! data until [`CompletionTracker::purge_completion_cache`] runs.

use acu_common::db::settings::{get_setting, get_site_admin_ids};
use acu_common::db::{ActivityRef, CompletionData, CompletionState, Course, Operator};
use acu_common::time::now_timestamp;
use acu_common::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::types::CompletionTracker;

/// Capability allowing completion overrides
pub const OVERRIDE_CAPABILITY: &str = "moodle/course:overridecompletion";

/// course_modules.completion value meaning tracking is off
const COMPLETION_TRACKING_NONE: i64 = 0;

/// course_modules.completion value for automatic completion
const COMPLETION_TRACKING_AUTOMATIC: i64 = 2;

pub struct SqliteCompletionTracker {
    db: SqlitePool,
    /// (activity id, user id) → state
    cache: RwLock<HashMap<(i64, i64), CompletionData>>,
}

impl SqliteCompletionTracker {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Number of cached states
    pub async fn cached_entries(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[async_trait]
impl CompletionTracker for SqliteCompletionTracker {
    /// Site switch (`enablecompletion` setting, on when unset) and course flag
    async fn is_completion_enabled(&self, course: &Course) -> Result<bool> {
        let site_enabled = get_setting::<i64>(&self.db, "enablecompletion")
            .await?
            .unwrap_or(1)
            != 0;
        Ok(site_enabled && course.enablecompletion)
    }

    async fn get_completion_state(&self, activity: &ActivityRef, user_id: i64) -> Result<CompletionData> {
        let key = (activity.id, user_id);
        if let Some(data) = self.cache.read().await.get(&key) {
            return Ok(*data);
        }

        let row: Option<(i64, i64)> = sqlx::query_as(
            "SELECT id, completionstate FROM course_modules_completion WHERE coursemoduleid = ? AND userid = ?",
        )
        .bind(activity.id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        let data = match row {
            Some((id, state)) => CompletionData {
                state: CompletionState::from_i64(state),
                record_id: Some(id),
            },
            None => CompletionData::incomplete(),
        };

        self.cache.write().await.insert(key, data);
        Ok(data)
    }

    async fn can_override_completion(&self, operator: &Operator, course: &Course) -> Result<bool> {
        if get_site_admin_ids(&self.db).await?.contains(&operator.user_id) {
            return Ok(true);
        }

        // Course context or system context (courseid = 0)
        let granted: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM role_assignments ra
            JOIN role_capabilities rc ON rc.roleid = ra.roleid
            WHERE ra.userid = ? AND ra.courseid IN (?, 0) AND rc.capability = ?
            "#,
        )
        .bind(operator.user_id)
        .bind(course.id)
        .bind(OVERRIDE_CAPABILITY)
        .fetch_one(&self.db)
        .await?;

        Ok(granted > 0)
    }

    async fn set_completion_complete(
        &self,
        activity: &ActivityRef,
        user_id: i64,
        operator: &Operator,
        allow_override: bool,
    ) -> Result<bool> {
        if activity.completion == COMPLETION_TRACKING_NONE {
            tracing::debug!(activity_id = activity.id, "Completion tracking disabled for activity");
            return Ok(false);
        }
        if activity.completion == COMPLETION_TRACKING_AUTOMATIC && !allow_override {
            tracing::debug!(activity_id = activity.id, "Automatic completion requires override");
            return Ok(false);
        }

        let override_by = allow_override.then_some(operator.user_id);

        sqlx::query(
            r#"
            INSERT INTO course_modules_completion (coursemoduleid, userid, completionstate, overrideby, timemodified)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(coursemoduleid, userid) DO UPDATE SET
                completionstate = excluded.completionstate,
                overrideby = excluded.overrideby,
                timemodified = excluded.timemodified
            "#,
        )
        .bind(activity.id)
        .bind(user_id)
        .bind(CompletionState::Complete.as_i64())
        .bind(override_by)
        .bind(now_timestamp())
        .execute(&self.db)
        .await?;

        self.cache.write().await.remove(&(activity.id, user_id));
        Ok(true)
    }

    async fn purge_completion_cache(&self) -> Result<()> {
        let mut cache = self.cache.write().await;
        tracing::debug!(entries = cache.len(), "Purging completion cache");
        cache.clear();
        Ok(())
    }
}
