//! Collaborator trait definitions
//!
//! The reconciler reads and mutates platform state only through these four
//! narrow seams. [`crate::db`] provides SQLite implementations; tests use
//! in-memory fakes.
//!
//! All methods return [`acu_common::Result`]. Implementations serialize
//! concurrent writers to the same (activity, user) key themselves.

use acu_common::db::{
    ActivityRef, CompletionData, CompletionRecord, Course, CourseCompletionRecord,
    CriterionCompletionRecord, Operator, User,
};
use acu_common::Result;
use async_trait::async_trait;

use crate::models::{CourseField, UserField};

/// Resolves courses, users and activities named by an import row
#[async_trait]
pub trait ActivityLocator: Send + Sync {
    /// Exactly one course matching `field = value`, else None
    async fn find_course_by_field(&self, field: CourseField, value: &str) -> Result<Option<Course>>;

    /// Exactly one user matching `field = value`, else None
    async fn find_user_by_field(&self, field: UserField, value: &str) -> Result<Option<User>>;

    /// First activity whose section and name match case-insensitively
    ///
    /// A `section_name` of `"0"` also matches the unnamed first section.
    async fn find_activity(
        &self,
        course: &Course,
        section_name: &str,
        activity_name: &str,
    ) -> Result<Option<ActivityRef>>;
}

/// Enrolment subsystem
#[async_trait]
pub trait EnrollmentService: Send + Sync {
    /// Enrol the user with the role; no-op when already enrolled
    async fn ensure_enrolled(&self, course_id: i64, user_id: i64, role_id: i64) -> Result<()>;
}

/// Completion-tracking subsystem, including its state cache
#[async_trait]
pub trait CompletionTracker: Send + Sync {
    async fn is_completion_enabled(&self, course: &Course) -> Result<bool>;

    /// Current state for (activity, user), possibly served from cache
    async fn get_completion_state(&self, activity: &ActivityRef, user_id: i64) -> Result<CompletionData>;

    /// Whether the operator may override completion in the course
    async fn can_override_completion(&self, operator: &Operator, course: &Course) -> Result<bool>;

    /// Request a transition to complete
    ///
    /// `Ok(false)` means the tracker declined the transition; `Err` is an
    /// unexpected failure.
    async fn set_completion_complete(
        &self,
        activity: &ActivityRef,
        user_id: i64,
        operator: &Operator,
        allow_override: bool,
    ) -> Result<bool>;

    /// Drop every cached completion state
    async fn purge_completion_cache(&self) -> Result<()>;
}

/// Record persistence for completion rows and course aggregates
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Materialized completion row in the complete state, if any
    async fn get_completion_record(&self, activity_id: i64, user_id: i64) -> Result<Option<CompletionRecord>>;

    async fn update_completion_record(&self, record: &CompletionRecord) -> Result<()>;

    async fn get_course_completion(&self, user_id: i64, course_id: i64) -> Result<Option<CourseCompletionRecord>>;

    async fn update_course_completion(&self, record: &CourseCompletionRecord) -> Result<()>;

    async fn get_criterion_completion(&self, user_id: i64, course_id: i64) -> Result<Option<CriterionCompletionRecord>>;

    async fn update_criterion_completion(&self, record: &CriterionCompletionRecord) -> Result<()>;
}
