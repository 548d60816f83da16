//! Settings database operations
//!
//! Get/set accessors for the key-value `settings` table.

use crate::config::{DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS};
use crate::{Error, Result};
use sqlx::{Pool, Sqlite};

/// Number of completion record polls after a state transition
///
/// **Returns:** None when unset, so callers can fall back to TOML config
pub async fn get_completion_poll_attempts(db: &Pool<Sqlite>) -> Result<Option<u32>> {
    get_setting(db, "completion_poll_attempts").await
}

/// Milliseconds to wait between completion record polls
pub async fn get_completion_poll_interval_ms(db: &Pool<Sqlite>) -> Result<Option<u64>> {
    get_setting(db, "completion_poll_interval_ms").await
}

pub async fn set_completion_poll_attempts(db: &Pool<Sqlite>, attempts: u32) -> Result<()> {
    set_setting(db, "completion_poll_attempts", attempts).await
}

pub async fn set_completion_poll_interval_ms(db: &Pool<Sqlite>, interval_ms: u64) -> Result<()> {
    set_setting(db, "completion_poll_interval_ms", interval_ms).await
}

/// Poll settings with compiled defaults applied
pub async fn get_completion_poll_settings(db: &Pool<Sqlite>) -> Result<(u32, u64)> {
    let attempts = get_completion_poll_attempts(db)
        .await?
        .unwrap_or(DEFAULT_POLL_ATTEMPTS);
    let interval_ms = get_completion_poll_interval_ms(db)
        .await?
        .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
    Ok((attempts, interval_ms))
}

/// User ids listed in the `siteadmins` setting
pub async fn get_site_admin_ids(db: &Pool<Sqlite>) -> Result<Vec<i64>> {
    let raw: Option<String> = get_setting(db, "siteadmins").await?;
    let raw = raw.unwrap_or_default();

    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|e| Error::Config(format!("Invalid siteadmins entry \"{}\": {}", s, e)))
        })
        .collect()
}

pub async fn set_site_admin_ids(db: &Pool<Sqlite>, ids: &[i64]) -> Result<()> {
    let joined = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    set_setting(db, "siteadmins", joined).await
}

/// Generic setting getter
///
/// Empty values read as unset.
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((Some(value),)) if !value.trim().is_empty() => {
            let parsed = value
                .trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting {} failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

/// Generic setting setter
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init::create_settings_table(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_poll_settings_default_when_missing() {
        let pool = setup_test_db().await;

        assert_eq!(get_completion_poll_attempts(&pool).await.unwrap(), None);
        assert_eq!(
            get_completion_poll_settings(&pool).await.unwrap(),
            (DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS)
        );
    }

    #[tokio::test]
    async fn test_poll_settings_roundtrip_and_update() {
        let pool = setup_test_db().await;

        set_completion_poll_attempts(&pool, 3).await.unwrap();
        set_completion_poll_interval_ms(&pool, 5).await.unwrap();
        set_completion_poll_attempts(&pool, 4).await.unwrap();

        assert_eq!(get_completion_poll_settings(&pool).await.unwrap(), (4, 5));
    }

    #[tokio::test]
    async fn test_unparseable_setting_is_config_error() {
        let pool = setup_test_db().await;
        sqlx::query("INSERT INTO settings (key, value) VALUES ('completion_poll_attempts', 'lots')")
            .execute(&pool)
            .await
            .unwrap();

        let result = get_completion_poll_attempts(&pool).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_site_admin_ids() {
        let pool = setup_test_db().await;
        assert!(get_site_admin_ids(&pool).await.unwrap().is_empty());

        set_site_admin_ids(&pool, &[2, 7]).await.unwrap();
        assert_eq!(get_site_admin_ids(&pool).await.unwrap(), vec![2, 7]);

        set_setting(&pool, "siteadmins", " 3 , ,9").await.unwrap();
        assert_eq!(get_site_admin_ids(&pool).await.unwrap(), vec![3, 9]);
    }
}
