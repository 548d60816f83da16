//! Completion reconciliation
//!
//! Decides, for one import record, whether to add a completion, correct the
//! date of an existing one, skip, or report an error, and performs the side
//! effects in order:
//!
//! ```text
//! role → course → completion enabled → user → activity
//!      → ensure enrolled → read state
//!          ├─ complete:   compare stored date → updated | skipped
//!          └─ incomplete: override allowed? → transition → purge cache
//!                         → poll for record → stamp date → added
//!                         → cascade course / criterion dates (best effort)
//! ```
//!
//! Expected failures become classified outcomes. A complete activity is never
//! moved back to incomplete; only its date can change.

use acu_common::db::{ActivityRef, Course, Operator, Role, User};
use acu_common::time::format_timestamp;
use acu_common::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::models::{ImportRecord, OutcomeKind, ReconciliationOutcome};
use crate::types::{ActivityLocator, CompletionTracker, EnrollmentService, RecordStore};
use crate::utils::{poll_until_found, PollPolicy};

/// Message when the completion row never shows up after a transition
pub const RECORD_NOT_MATERIALIZED: &str = "Failed to retrieve the completion record for updating.";

/// Entities resolved so far, attached to whatever outcome is returned
#[derive(Default)]
struct Resolved {
    course: Option<Course>,
    user: Option<User>,
}

/// Reconciles import records against platform completion state
pub struct Reconciler {
    locator: Arc<dyn ActivityLocator>,
    enrollment: Arc<dyn EnrollmentService>,
    tracker: Arc<dyn CompletionTracker>,
    store: Arc<dyn RecordStore>,
    poll_policy: PollPolicy,
}

impl Reconciler {
    pub fn new(
        locator: Arc<dyn ActivityLocator>,
        enrollment: Arc<dyn EnrollmentService>,
        tracker: Arc<dyn CompletionTracker>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            locator,
            enrollment,
            tracker,
            store,
            poll_policy: PollPolicy::default(),
        }
    }

    /// Replace the completion record polling policy
    pub fn with_poll_policy(mut self, poll_policy: PollPolicy) -> Self {
        self.poll_policy = poll_policy;
        self
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll_policy
    }

    /// Reconcile one validated record
    ///
    /// `role` is the role users are enrolled with; `operator` is the account
    /// whose authority is checked before overriding completion. Never fails:
    /// collaborator errors are reported as error outcomes.
    pub async fn reconcile(
        &self,
        record: &ImportRecord,
        role: Option<&Role>,
        operator: &Operator,
    ) -> ReconciliationOutcome {
        let mut resolved = Resolved::default();

        let outcome = match self.reconcile_inner(record, role, operator, &mut resolved).await {
            Ok(outcome) => outcome,
            Err(e) => ReconciliationOutcome::error(e.to_string()),
        };
        let outcome = outcome.with_entities(resolved.course.as_ref(), resolved.user.as_ref());

        match outcome.kind {
            OutcomeKind::Error => error!(
                course = %record.course_value,
                user = %record.user_value,
                activity = %record.activity_name,
                detail = outcome.message(),
                "Record failed"
            ),
            kind => info!(
                course = %record.course_value,
                user = %record.user_value,
                activity = %record.activity_name,
                outcome = ?kind,
                detail = outcome.message(),
                "Record reconciled"
            ),
        }

        outcome
    }

    async fn reconcile_inner(
        &self,
        record: &ImportRecord,
        role: Option<&Role>,
        operator: &Operator,
        resolved: &mut Resolved,
    ) -> Result<ReconciliationOutcome> {
        let role = match role {
            Some(role) if role.id > 0 => role,
            _ => return Ok(ReconciliationOutcome::error("Invalid student role object")),
        };

        let course = match self
            .locator
            .find_course_by_field(record.course_field, &record.course_value)
            .await?
        {
            Some(course) => course,
            None => {
                return Ok(ReconciliationOutcome::skipped(format!(
                    "Unable to find course matching \"{}\"",
                    record.course_value
                )))
            }
        };
        resolved.course = Some(course.clone());
        debug!(course_id = course.id, "Course resolved");

        if !self.tracker.is_completion_enabled(&course).await? {
            return Ok(ReconciliationOutcome::skipped(format!(
                "Course \"{}\" does not have completions enabled",
                course.fullname
            )));
        }

        let user = match self
            .locator
            .find_user_by_field(record.user_field, &record.user_value)
            .await?
        {
            Some(user) => user,
            None => {
                return Ok(ReconciliationOutcome::skipped(format!(
                    "Unable to find user matching \"{}\"",
                    record.user_value
                )))
            }
        };
        resolved.user = Some(user.clone());
        debug!(user_id = user.id, "User resolved");

        let activity = match self
            .locator
            .find_activity(&course, &record.section_name, &record.activity_name)
            .await?
        {
            Some(activity) => activity,
            None => {
                return Ok(ReconciliationOutcome::skipped(format!(
                    "Unable to find activity \"{}\" in topic \"{}\" in course \"{}\"",
                    record.activity_name, record.section_name, course.fullname
                )))
            }
        };
        debug!(activity_id = activity.id, "Activity resolved");

        // Enrol first so completion reads are never blocked by a missing enrolment
        self.enrollment
            .ensure_enrolled(course.id, user.id, role.id)
            .await?;

        let current = self.tracker.get_completion_state(&activity, user.id).await?;

        if current.is_complete() {
            self.refresh_completion_date(record, &activity, &user).await
        } else {
            self.complete_activity(record, &course, &activity, &user, operator)
                .await
        }
    }

    /// Already complete: only the stored date may change
    ///
    /// A complete state with no completion record is an inconsistency the
    /// platform tolerates without producing any outcome or mutation. Here it
    /// is still a no-op, but reported as `skipped` with a warning, since
    /// every record gets exactly one outcome.
    async fn refresh_completion_date(
        &self,
        record: &ImportRecord,
        activity: &ActivityRef,
        user: &User,
    ) -> Result<ReconciliationOutcome> {
        let Some(mut completion) = self
            .store
            .get_completion_record(activity.id, user.id)
            .await?
        else {
            warn!(
                activity_id = activity.id,
                user_id = user.id,
                "Completion state is complete but no completion record exists"
            );
            return Ok(ReconciliationOutcome::skipped(format!(
                "Activity \"{}\" in topic \"{}\" is marked complete but has no completion record; nothing was changed.",
                record.activity_name, record.section_name
            )));
        };

        if completion.timemodified == record.completion_date {
            return Ok(ReconciliationOutcome::skipped(format!(
                "Activity \"{}\" in topic \"{}\" was already completed and the completion date is the same.",
                record.activity_name, record.section_name
            )));
        }

        debug!(
            from = %format_timestamp(completion.timemodified),
            to = %format_timestamp(record.completion_date),
            "Updating completion date"
        );
        completion.timemodified = record.completion_date;
        self.store.update_completion_record(&completion).await?;

        Ok(ReconciliationOutcome::updated(format!(
            "Activity \"{}\" in topic \"{}\" was already completed but the completion date was updated.",
            record.activity_name, record.section_name
        )))
    }

    /// Incomplete: override, wait for the record, stamp the date
    async fn complete_activity(
        &self,
        record: &ImportRecord,
        course: &Course,
        activity: &ActivityRef,
        user: &User,
        operator: &Operator,
    ) -> Result<ReconciliationOutcome> {
        if !self
            .tracker
            .can_override_completion(operator, course)
            .await?
        {
            return Ok(ReconciliationOutcome::skipped(format!(
                "Configured user unable to override completion in course {}",
                course.fullname
            )));
        }

        // Failures from here on are reported with the underlying message;
        // nothing already written is rolled back.
        match self
            .apply_completion(record, course, activity, user, operator)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => Ok(ReconciliationOutcome::error(format!(
                "Exception occurred while updating completion state: {}",
                e
            ))),
        }
    }

    async fn apply_completion(
        &self,
        record: &ImportRecord,
        course: &Course,
        activity: &ActivityRef,
        user: &User,
        operator: &Operator,
    ) -> Result<ReconciliationOutcome> {
        let transitioned = self
            .tracker
            .set_completion_complete(activity, user.id, operator, true)
            .await?;

        let confirmed = transitioned
            || self
                .tracker
                .get_completion_state(activity, user.id)
                .await?
                .is_complete();

        if !confirmed {
            warn!(
                activity_id = activity.id,
                user_id = user.id,
                "Completion transition declined and state is still incomplete"
            );
            return Ok(ReconciliationOutcome::error(format!(
                "Unable to mark activity \"{}\" in topic \"{}\" as complete",
                record.activity_name, record.section_name
            )));
        }
        if !transitioned {
            warn!(
                activity_id = activity.id,
                user_id = user.id,
                "Completion transition reported failure but state reads complete"
            );
        }

        self.tracker.purge_completion_cache().await?;

        let store = &self.store;
        let (activity_id, user_id) = (activity.id, user.id);
        let found = poll_until_found("completion record", self.poll_policy, move || {
            store.get_completion_record(activity_id, user_id)
        })
        .await?;

        let Some(mut completion) = found else {
            return Ok(ReconciliationOutcome::error(RECORD_NOT_MATERIALIZED));
        };

        completion.timemodified = record.completion_date;
        self.store.update_completion_record(&completion).await?;

        self.cascade_course_dates(course, user, record.completion_date)
            .await;

        Ok(ReconciliationOutcome::added(format!(
            "Activity \"{}\" in topic \"{}\" was completed on behalf of user.",
            record.activity_name, record.section_name
        )))
    }

    /// Copy the completion date onto course aggregates when they exist
    ///
    /// Best effort: failures are logged and do not change the outcome.
    async fn cascade_course_dates(&self, course: &Course, user: &User, completion_date: i64) {
        if let Err(e) = self
            .cascade_course_completion(course, user, completion_date)
            .await
        {
            warn!(course_id = course.id, user_id = user.id, "Course completion date not updated: {}", e);
        }

        if let Err(e) = self
            .cascade_criterion_completion(course, user, completion_date)
            .await
        {
            warn!(course_id = course.id, user_id = user.id, "Criterion completion date not updated: {}", e);
        }
    }

    async fn cascade_course_completion(
        &self,
        course: &Course,
        user: &User,
        completion_date: i64,
    ) -> Result<()> {
        if let Some(mut aggregate) = self.store.get_course_completion(user.id, course.id).await? {
            aggregate.timecompleted = Some(completion_date);
            aggregate.timestarted = completion_date;
            self.store.update_course_completion(&aggregate).await?;
        }
        Ok(())
    }

    async fn cascade_criterion_completion(
        &self,
        course: &Course,
        user: &User,
        completion_date: i64,
    ) -> Result<()> {
        if let Some(mut criterion) = self
            .store
            .get_criterion_completion(user.id, course.id)
            .await?
        {
            criterion.timecompleted = Some(completion_date);
            self.store.update_criterion_completion(&criterion).await?;
        }
        Ok(())
    }
}
