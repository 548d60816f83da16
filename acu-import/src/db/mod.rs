//! SQLite-backed collaborators
//!
//! Implement the traits in [`crate::types`] over the schema created by
//! [`acu_common::db::init_database`].

pub mod completion;
pub mod enrolment;
pub mod locator;
pub mod records;
pub mod roles;

pub use completion::SqliteCompletionTracker;
pub use enrolment::SqliteEnrollmentService;
pub use locator::SqliteActivityLocator;
pub use records::SqliteRecordStore;
pub use roles::{find_operator_by_username, find_role_by_shortname};

use crate::services::Reconciler;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Reconciler wired to SQLite collaborators sharing one pool
pub fn sqlite_reconciler(db: SqlitePool) -> Reconciler {
    Reconciler::new(
        Arc::new(SqliteActivityLocator::new(db.clone())),
        Arc::new(SqliteEnrollmentService::new(db.clone())),
        Arc::new(SqliteCompletionTracker::new(db.clone())),
        Arc::new(SqliteRecordStore::new(db)),
    )
}
