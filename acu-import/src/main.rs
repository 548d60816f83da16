//! acu-import - bulk activity completion import
//!
//! Marks activities complete for users from a CSV file, enrolling users where
//! needed and stamping the imported completion dates.

use acu_common::config::{
    load_config, resolve_database_path, TomlConfig, DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS,
};
use acu_common::db::init_database;
use acu_common::db::settings::{get_completion_poll_attempts, get_completion_poll_interval_ms};
use acu_import::db::{find_operator_by_username, find_role_by_shortname, sqlite_reconciler};
use acu_import::models::{CourseField, UserField};
use acu_import::services::{BatchImporter, BatchOptions};
use acu_import::{ImportError, PollPolicy};
use anyhow::{Context, Result};
use clap::Parser;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Mark activities complete from a CSV of completion records
#[derive(Debug, Parser)]
#[command(name = "acu-import", version, about)]
struct Cli {
    /// CSV file with course, user, section, activity, completiondate columns
    file: PathBuf,

    /// SQLite database (overrides ACU_DATABASE and config)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Config file (defaults to ACU_CONFIG or <config dir>/acu/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Course column matched against the course cell
    #[arg(long)]
    course_field: Option<String>,

    /// User column matched against the user cell
    #[arg(long)]
    user_field: Option<String>,

    /// Shortname of the role users are enrolled with
    #[arg(long)]
    role: Option<String>,

    /// Username whose authority is used to override completion
    #[arg(long, env = "ACU_OPERATOR")]
    operator: Option<String>,

    /// CSV delimiter
    #[arg(long)]
    delimiter: Option<char>,

    /// Completion record lookups after a transition
    #[arg(long)]
    poll_attempts: Option<u32>,

    /// Milliseconds between completion record lookups
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting acu-import v{}", env!("CARGO_PKG_VERSION"));

    let db_path = resolve_database_path(cli.database.as_deref(), &config);
    info!("Database: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let options = batch_options(&cli, &config)?;
    let poll_policy = resolve_poll_policy(&cli, &config, &pool).await?;

    let role_name = cli.role.as_deref().unwrap_or(&config.import.student_role);
    let role = find_role_by_shortname(&pool, role_name).await?;
    if role.is_none() {
        warn!("Role \"{}\" not found; every row will be reported as an error", role_name);
    }

    let operator_name = cli
        .operator
        .as_deref()
        .or(config.import.operator.as_deref())
        .ok_or_else(|| ImportError::InvalidConfig("no operator configured (use --operator)".to_string()))?;
    let operator = find_operator_by_username(&pool, operator_name)
        .await?
        .ok_or_else(|| ImportError::InvalidConfig(format!("operator \"{}\" not found", operator_name)))?;

    let reconciler = sqlite_reconciler(pool.clone()).with_poll_policy(poll_policy);
    let importer = BatchImporter::new(reconciler, role, operator, options);
    let summary = importer.import_path(&cli.file).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for row in &summary.rows {
            let kind = row
                .kind
                .map(|k| format!("{:?}", k).to_lowercase())
                .unwrap_or_else(|| "invalid".to_string());
            println!("line {:>5}  {:<8} {}", row.line, kind, row.message);
        }
        println!(
            "\nTotal: {}  Added: {}  Updated: {}  Skipped: {}  Errors: {}  Invalid: {}",
            summary.total, summary.added, summary.updated, summary.skipped, summary.errors, summary.invalid
        );
    }

    pool.close().await;
    Ok(())
}

fn batch_options(cli: &Cli, config: &TomlConfig) -> Result<BatchOptions> {
    let course_field: CourseField = cli
        .course_field
        .as_deref()
        .unwrap_or(&config.import.course_field)
        .parse()?;
    let user_field: UserField = cli
        .user_field
        .as_deref()
        .unwrap_or(&config.import.user_field)
        .parse()?;

    let delimiter = match cli.delimiter {
        Some(c) => c,
        None => config.import.delimiter.chars().next().unwrap_or(','),
    };
    if !delimiter.is_ascii() {
        return Err(ImportError::InvalidConfig(format!("delimiter {:?} is not ASCII", delimiter)).into());
    }

    Ok(BatchOptions {
        course_field,
        user_field,
        delimiter: delimiter as u8,
    })
}

/// Command line → settings table → TOML → compiled default
async fn resolve_poll_policy(cli: &Cli, config: &TomlConfig, pool: &SqlitePool) -> Result<PollPolicy> {
    let attempts = match cli.poll_attempts {
        Some(n) => n,
        None => get_completion_poll_attempts(pool)
            .await?
            .or(config.completion_poll.attempts)
            .unwrap_or(DEFAULT_POLL_ATTEMPTS),
    };
    let interval_ms = match cli.poll_interval_ms {
        Some(ms) => ms,
        None => get_completion_poll_interval_ms(pool)
            .await?
            .or(config.completion_poll.interval_ms)
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
    };

    Ok(PollPolicy::new(attempts, Duration::from_millis(interval_ms)))
}
