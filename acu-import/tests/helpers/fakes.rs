//! In-memory collaborators
//!
//! One `FakePlatform` implements all four collaborator traits over shared
//! state, with knobs for materialization lag and failure injection.

use acu_common::db::{
    ActivityRef, CompletionData, CompletionRecord, CompletionState, Course,
    CourseCompletionRecord, CriterionCompletionRecord, Operator, Role, User,
};
use acu_common::{Error, Result};
use acu_import::db::locator::section_matches;
use acu_import::models::{CourseField, ImportRecord, UserField};
use acu_import::types::{ActivityLocator, CompletionTracker, EnrollmentService, RecordStore};
use acu_import::{PollPolicy, Reconciler};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

pub const COURSE_ID: i64 = 1;
pub const USER_ID: i64 = 10;
pub const ACTIVITY_ID: i64 = 100;
pub const OPERATOR_ID: i64 = 2;
/// Timestamp the fake tracker stamps on freshly materialized records
pub const TRACKER_TIMESTAMP: i64 = 1_000;

/// How `set_completion_complete` behaves
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionMode {
    /// Marks complete, returns true
    Succeed,
    /// Marks complete but returns false
    ReportFailureButComplete,
    /// Returns false without changing anything
    Decline,
    /// Returns an error with this message
    Fail(String),
}

#[derive(Debug)]
pub struct FakeState {
    pub courses: Vec<Course>,
    pub users: Vec<User>,
    pub activities: Vec<ActivityRef>,
    pub states: HashMap<(i64, i64), CompletionState>,
    pub records: HashMap<(i64, i64), CompletionRecord>,
    /// Written by the tracker, not yet visible to the record store
    pub pending: HashMap<(i64, i64), CompletionRecord>,
    pub course_completions: HashMap<(i64, i64), CourseCompletionRecord>,
    pub criteria: HashMap<(i64, i64), CriterionCompletionRecord>,
    pub enrolments: Vec<(i64, i64, i64)>,
    pub can_override: bool,
    pub transition: TransitionMode,
    /// Record reads returning None before a pending record appears; None = never
    pub materialize_after: Option<u32>,
    pub fail_enrolment: bool,
    pub transition_calls: u32,
    pub purge_calls: u32,
    pub record_reads: u32,
    pub record_writes: u32,
    /// Call order of side-effecting operations
    pub events: Vec<&'static str>,
}

pub struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    /// CS101 with completion on, user alice, "Intro Video" in the unnamed
    /// section and "Quiz 1" in "Week 1". Operator may override.
    pub fn new() -> Arc<Self> {
        let course = Course {
            id: COURSE_ID,
            shortname: "CS101".to_string(),
            fullname: "Introduction to Computing".to_string(),
            idnumber: Some("C-101".to_string()),
            enablecompletion: true,
        };
        let user = User {
            id: USER_ID,
            username: "alice".to_string(),
            idnumber: None,
            email: Some("alice@example.org".to_string()),
            firstname: "Alice".to_string(),
            lastname: "Liddell".to_string(),
        };
        let activities = vec![
            ActivityRef {
                id: ACTIVITY_ID,
                course: COURSE_ID,
                section_id: 50,
                section_number: 0,
                section_name: None,
                name: "Intro Video".to_string(),
                completion: 1,
            },
            ActivityRef {
                id: ACTIVITY_ID + 1,
                course: COURSE_ID,
                section_id: 51,
                section_number: 1,
                section_name: Some("Week 1".to_string()),
                name: "Quiz 1".to_string(),
                completion: 2,
            },
        ];

        Arc::new(Self {
            state: Mutex::new(FakeState {
                courses: vec![course],
                users: vec![user],
                activities,
                states: HashMap::new(),
                records: HashMap::new(),
                pending: HashMap::new(),
                course_completions: HashMap::new(),
                criteria: HashMap::new(),
                enrolments: Vec::new(),
                can_override: true,
                transition: TransitionMode::Succeed,
                materialize_after: Some(0),
                fail_enrolment: false,
                transition_calls: 0,
                purge_calls: 0,
                record_reads: 0,
                record_writes: 0,
                events: Vec::new(),
            }),
        })
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Mark (activity, user) complete with a record carrying `timemodified`
    pub fn seed_completed(&self, activity_id: i64, user_id: i64, timemodified: i64) {
        let mut state = self.state();
        state.states.insert((activity_id, user_id), CompletionState::Complete);
        state.records.insert(
            (activity_id, user_id),
            CompletionRecord {
                id: 900,
                coursemoduleid: activity_id,
                userid: user_id,
                completionstate: 1,
                overrideby: None,
                timemodified,
            },
        );
    }

    pub fn seed_aggregates(&self, user_id: i64, course_id: i64) {
        let mut state = self.state();
        state.course_completions.insert(
            (user_id, course_id),
            CourseCompletionRecord {
                id: 70,
                userid: user_id,
                course: course_id,
                timeenrolled: 5,
                timestarted: 5,
                timecompleted: None,
            },
        );
        state.criteria.insert(
            (user_id, course_id),
            CriterionCompletionRecord {
                id: 80,
                userid: user_id,
                course: course_id,
                criteriaid: 3,
                timecompleted: None,
            },
        );
    }

    pub fn stored_date(&self, activity_id: i64, user_id: i64) -> Option<i64> {
        self.state()
            .records
            .get(&(activity_id, user_id))
            .map(|r| r.timemodified)
    }

    /// Reconciler over this platform with a zero-wait 10-attempt poll
    pub fn reconciler(self: &Arc<Self>) -> Reconciler {
        Reconciler::new(self.clone(), self.clone(), self.clone(), self.clone())
            .with_poll_policy(PollPolicy::immediate(10))
    }
}

pub fn student_role() -> Role {
    Role {
        id: 5,
        shortname: "student".to_string(),
        name: "Student".to_string(),
    }
}

pub fn operator() -> Operator {
    Operator {
        user_id: OPERATOR_ID,
        username: "admin".to_string(),
    }
}

pub fn record(section: &str, activity: &str, completion_date: i64) -> ImportRecord {
    ImportRecord {
        course_field: CourseField::Shortname,
        course_value: "CS101".to_string(),
        user_field: UserField::Username,
        user_value: "alice".to_string(),
        section_name: section.to_string(),
        activity_name: activity.to_string(),
        completion_date,
    }
}

fn single<T: Clone>(matches: Vec<&T>) -> Option<T> {
    if matches.len() == 1 {
        Some(matches[0].clone())
    } else {
        None
    }
}

#[async_trait]
impl ActivityLocator for FakePlatform {
    async fn find_course_by_field(&self, field: CourseField, value: &str) -> Result<Option<Course>> {
        let state = self.state();
        let matches = state
            .courses
            .iter()
            .filter(|c| match field {
                CourseField::Id => c.id.to_string() == value,
                CourseField::Shortname => c.shortname == value,
                CourseField::Idnumber => c.idnumber.as_deref() == Some(value),
                CourseField::Fullname => c.fullname == value,
            })
            .collect();
        Ok(single(matches))
    }

    async fn find_user_by_field(&self, field: UserField, value: &str) -> Result<Option<User>> {
        let state = self.state();
        let matches = state
            .users
            .iter()
            .filter(|u| match field {
                UserField::Id => u.id.to_string() == value,
                UserField::Username => u.username == value,
                UserField::Idnumber => u.idnumber.as_deref() == Some(value),
                UserField::Email => u.email.as_deref() == Some(value),
            })
            .collect();
        Ok(single(matches))
    }

    async fn find_activity(
        &self,
        course: &Course,
        section_name: &str,
        activity_name: &str,
    ) -> Result<Option<ActivityRef>> {
        let state = self.state();
        Ok(state
            .activities
            .iter()
            .find(|a| {
                a.course == course.id
                    && section_matches(section_name, a.section_name.as_deref())
                    && a.name.eq_ignore_ascii_case(activity_name)
            })
            .cloned())
    }
}

#[async_trait]
impl EnrollmentService for FakePlatform {
    async fn ensure_enrolled(&self, course_id: i64, user_id: i64, role_id: i64) -> Result<()> {
        let mut state = self.state();
        state.events.push("enrol");
        if state.fail_enrolment {
            return Err(Error::Internal("enrolment plugin unavailable".to_string()));
        }
        let entry = (course_id, user_id, role_id);
        if !state.enrolments.contains(&entry) {
            state.enrolments.push(entry);
        }
        Ok(())
    }
}

#[async_trait]
impl CompletionTracker for FakePlatform {
    async fn is_completion_enabled(&self, course: &Course) -> Result<bool> {
        Ok(course.enablecompletion)
    }

    async fn get_completion_state(&self, activity: &ActivityRef, user_id: i64) -> Result<CompletionData> {
        let mut state = self.state();
        state.events.push("read_state");
        let key = (activity.id, user_id);
        Ok(match state.states.get(&key) {
            Some(s) => CompletionData {
                state: *s,
                record_id: state.records.get(&key).map(|r| r.id),
            },
            None => CompletionData::incomplete(),
        })
    }

    async fn can_override_completion(&self, _operator: &Operator, _course: &Course) -> Result<bool> {
        Ok(self.state().can_override)
    }

    async fn set_completion_complete(
        &self,
        activity: &ActivityRef,
        user_id: i64,
        operator: &Operator,
        allow_override: bool,
    ) -> Result<bool> {
        let mut state = self.state();
        state.events.push("transition");
        state.transition_calls += 1;
        assert!(allow_override, "reconciler must request an override");

        let key = (activity.id, user_id);
        let reported = match state.transition.clone() {
            TransitionMode::Succeed => true,
            TransitionMode::ReportFailureButComplete => false,
            TransitionMode::Decline => return Ok(false),
            TransitionMode::Fail(message) => return Err(Error::Internal(message)),
        };

        state.states.insert(key, CompletionState::Complete);
        state.pending.insert(
            key,
            CompletionRecord {
                id: 901,
                coursemoduleid: activity.id,
                userid: user_id,
                completionstate: 1,
                overrideby: Some(operator.user_id),
                timemodified: TRACKER_TIMESTAMP,
            },
        );
        Ok(reported)
    }

    async fn purge_completion_cache(&self) -> Result<()> {
        let mut state = self.state();
        state.events.push("purge");
        state.purge_calls += 1;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FakePlatform {
    async fn get_completion_record(&self, activity_id: i64, user_id: i64) -> Result<Option<CompletionRecord>> {
        let mut state = self.state();
        state.record_reads += 1;
        let key = (activity_id, user_id);

        if let Some(record) = state.records.get(&key) {
            return Ok(Some(record.clone()));
        }

        if state.pending.contains_key(&key) {
            let lag = state.materialize_after;
            match lag {
                Some(0) => {
                    if let Some(record) = state.pending.remove(&key) {
                        state.records.insert(key, record.clone());
                        return Ok(Some(record));
                    }
                }
                Some(n) => state.materialize_after = Some(n - 1),
                None => {}
            }
        }

        Ok(None)
    }

    async fn update_completion_record(&self, record: &CompletionRecord) -> Result<()> {
        let mut state = self.state();
        state.record_writes += 1;
        state
            .records
            .insert((record.coursemoduleid, record.userid), record.clone());
        Ok(())
    }

    async fn get_course_completion(&self, user_id: i64, course_id: i64) -> Result<Option<CourseCompletionRecord>> {
        Ok(self.state().course_completions.get(&(user_id, course_id)).cloned())
    }

    async fn update_course_completion(&self, record: &CourseCompletionRecord) -> Result<()> {
        self.state()
            .course_completions
            .insert((record.userid, record.course), record.clone());
        Ok(())
    }

    async fn get_criterion_completion(&self, user_id: i64, course_id: i64) -> Result<Option<CriterionCompletionRecord>> {
        Ok(self.state().criteria.get(&(user_id, course_id)).cloned())
    }

    async fn update_criterion_completion(&self, record: &CriterionCompletionRecord) -> Result<()> {
        self.state()
            .criteria
            .insert((record.userid, record.course), record.clone());
        Ok(())
    }
}
