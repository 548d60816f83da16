//! Role and operator lookup for the command line

use acu_common::db::{Operator, Role};
use acu_common::Result;
use sqlx::SqlitePool;

/// Role by shortname (e.g. `student`)
pub async fn find_role_by_shortname(db: &SqlitePool, shortname: &str) -> Result<Option<Role>> {
    let role = sqlx::query_as::<_, Role>("SELECT id, shortname, name FROM roles WHERE shortname = ?")
        .bind(shortname)
        .fetch_optional(db)
        .await?;

    Ok(role)
}

/// Operator account by username
pub async fn find_operator_by_username(db: &SqlitePool, username: &str) -> Result<Option<Operator>> {
    let row: Option<(i64, String)> = sqlx::query_as("SELECT id, username FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(db)
        .await?;

    Ok(row.map(|(user_id, username)| Operator { user_id, username }))
}
