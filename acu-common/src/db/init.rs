//! Database initialization
//!
//! Creates the learning-platform tables the importer reads and writes.
//! Every statement is idempotent, so opening an existing database is safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the database file and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table and default setting
///
/// Public so tests can build the schema on an in-memory pool.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_settings_table(pool).await?;
    create_courses_table(pool).await?;
    create_users_table(pool).await?;
    create_roles_table(pool).await?;
    create_course_sections_table(pool).await?;
    create_course_modules_table(pool).await?;

    // Enrolment and authorization
    create_enrol_table(pool).await?;
    create_user_enrolments_table(pool).await?;
    create_role_assignments_table(pool).await?;
    create_role_capabilities_table(pool).await?;

    // Completion tracking
    create_course_modules_completion_table(pool).await?;
    create_course_completions_table(pool).await?;
    create_course_completion_crit_compl_table(pool).await?;

    init_default_settings(pool).await?;

    Ok(())
}

/// Create the settings table
///
/// Stores key-value configuration that overrides TOML defaults.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Site-wide completion tracking switch
    ensure_setting(pool, "enablecompletion", "1").await?;
    // Comma separated user ids allowed to override completion everywhere
    ensure_setting(pool, "siteadmins", "").await?;
    Ok(())
}

async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(default_value)
        .execute(pool)
        .await?;

    // Reset NULLs left behind by manual edits
    sqlx::query("UPDATE settings SET value = ? WHERE key = ? AND value IS NULL")
        .bind(default_value)
        .bind(key)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_courses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            shortname TEXT NOT NULL,
            fullname TEXT NOT NULL,
            idnumber TEXT,
            enablecompletion INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            idnumber TEXT,
            email TEXT,
            firstname TEXT NOT NULL DEFAULT '',
            lastname TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_roles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS roles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            shortname TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO roles (shortname, name)
        VALUES ('student', 'Student'), ('editingteacher', 'Teacher'), ('manager', 'Manager')
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_course_sections_table(pool: &SqlitePool) -> Result<()> {
    // name IS NULL marks the unnamed first section
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS course_sections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            section INTEGER NOT NULL,
            name TEXT,
            UNIQUE(course, section)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_course_modules_table(pool: &SqlitePool) -> Result<()> {
    // completion: 0 = tracking disabled, 1 = manual, 2 = automatic
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS course_modules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            section INTEGER NOT NULL REFERENCES course_sections(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            completion INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_enrol_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enrol (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            courseid INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            enrol TEXT NOT NULL,
            status INTEGER NOT NULL DEFAULT 0,
            UNIQUE(courseid, enrol)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_user_enrolments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_enrolments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            enrolid INTEGER NOT NULL REFERENCES enrol(id) ON DELETE CASCADE,
            userid INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            status INTEGER NOT NULL DEFAULT 0,
            timecreated INTEGER NOT NULL,
            UNIQUE(enrolid, userid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_role_assignments_table(pool: &SqlitePool) -> Result<()> {
    // courseid = 0 is the system context
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS role_assignments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            roleid INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
            userid INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            courseid INTEGER NOT NULL DEFAULT 0,
            timemodified INTEGER NOT NULL,
            UNIQUE(roleid, userid, courseid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_role_capabilities_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS role_capabilities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            roleid INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
            capability TEXT NOT NULL,
            UNIQUE(roleid, capability)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO role_capabilities (roleid, capability)
        SELECT id, 'moodle/course:overridecompletion' FROM roles
        WHERE shortname IN ('editingteacher', 'manager')
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_course_modules_completion_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS course_modules_completion (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            coursemoduleid INTEGER NOT NULL REFERENCES course_modules(id) ON DELETE CASCADE,
            userid INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            completionstate INTEGER NOT NULL DEFAULT 0,
            overrideby INTEGER,
            timemodified INTEGER NOT NULL,
            UNIQUE(coursemoduleid, userid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_course_completions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS course_completions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            userid INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            course INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            timeenrolled INTEGER NOT NULL DEFAULT 0,
            timestarted INTEGER NOT NULL DEFAULT 0,
            timecompleted INTEGER,
            UNIQUE(userid, course)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_course_completion_crit_compl_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS course_completion_crit_compl (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            userid INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            course INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            criteriaid INTEGER NOT NULL DEFAULT 0,
            timecompleted INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
