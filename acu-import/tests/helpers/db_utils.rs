//! Database Test Utilities
//!
//! Builds an in-memory platform database with a small fixed data set.

use acu_common::db::create_schema;
use acu_common::db::settings::set_site_admin_ids;
use acu_common::db::{Operator, Role};
use acu_import::db::{find_operator_by_username, find_role_by_shortname};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Ids of the seeded rows
#[derive(Debug, Clone)]
pub struct SeededIds {
    pub course: i64,
    pub other_course: i64,
    pub alice: i64,
    pub bob: i64,
    pub carol: i64,
    pub intro_video: i64,
    pub quiz: i64,
    pub untracked: i64,
    pub student: Role,
    /// bob: editingteacher in CS101 only
    pub teacher: Operator,
    /// carol: site admin
    pub admin: Operator,
    /// alice: no authority
    pub learner: Operator,
}

async fn insert(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query(sql)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

/// Seeded data:
/// - CS101 (completion on) with unnamed section 0 ("Intro Video") and
///   "Week 1" ("Quiz 1", "Untracked Reading" with tracking off)
/// - HIST200 (completion on), fullname shared with a third course
/// - users alice, bob (teacher in CS101), carol (site admin)
pub async fn create_seeded_db() -> (SqlitePool, SeededIds) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();

    let course = insert(
        &pool,
        "INSERT INTO courses (shortname, fullname, idnumber, enablecompletion) VALUES ('CS101', 'Introduction to Computing', 'C-101', 1)",
    )
    .await;
    let other_course = insert(
        &pool,
        "INSERT INTO courses (shortname, fullname, enablecompletion) VALUES ('HIST200', 'World History', 1)",
    )
    .await;
    insert(
        &pool,
        "INSERT INTO courses (shortname, fullname, enablecompletion) VALUES ('HIST201', 'World History', 0)",
    )
    .await;

    let alice = insert(
        &pool,
        "INSERT INTO users (username, idnumber, email, firstname, lastname) VALUES ('alice', 'S-1', 'alice@example.org', 'Alice', 'Liddell')",
    )
    .await;
    let bob = insert(
        &pool,
        "INSERT INTO users (username, email, firstname, lastname) VALUES ('bob', 'bob@example.org', 'Bob', 'Teacher')",
    )
    .await;
    let carol = insert(
        &pool,
        "INSERT INTO users (username, email, firstname, lastname) VALUES ('carol', 'carol@example.org', 'Carol', 'Admin')",
    )
    .await;

    let section0 = insert(
        &pool,
        &format!("INSERT INTO course_sections (course, section, name) VALUES ({}, 0, NULL)", course),
    )
    .await;
    let week1 = insert(
        &pool,
        &format!("INSERT INTO course_sections (course, section, name) VALUES ({}, 1, 'Week 1')", course),
    )
    .await;

    let intro_video = insert(
        &pool,
        &format!(
            "INSERT INTO course_modules (course, section, name, completion) VALUES ({}, {}, 'Intro Video', 1)",
            course, section0
        ),
    )
    .await;
    let quiz = insert(
        &pool,
        &format!(
            "INSERT INTO course_modules (course, section, name, completion) VALUES ({}, {}, 'Quiz 1', 2)",
            course, week1
        ),
    )
    .await;
    let untracked = insert(
        &pool,
        &format!(
            "INSERT INTO course_modules (course, section, name, completion) VALUES ({}, {}, 'Untracked Reading', 0)",
            course, week1
        ),
    )
    .await;

    insert(
        &pool,
        &format!(
            "INSERT INTO role_assignments (roleid, userid, courseid, timemodified)
             SELECT id, {}, {}, 0 FROM roles WHERE shortname = 'editingteacher'",
            bob, course
        ),
    )
    .await;
    set_site_admin_ids(&pool, &[carol]).await.unwrap();

    let student = find_role_by_shortname(&pool, "student").await.unwrap().unwrap();
    let teacher = find_operator_by_username(&pool, "bob").await.unwrap().unwrap();
    let admin = find_operator_by_username(&pool, "carol").await.unwrap().unwrap();
    let learner = find_operator_by_username(&pool, "alice").await.unwrap().unwrap();

    let ids = SeededIds {
        course,
        other_course,
        alice,
        bob,
        carol,
        intro_video,
        quiz,
        untracked,
        student,
        teacher,
        admin,
        learner,
    };

    (pool, ids)
}
