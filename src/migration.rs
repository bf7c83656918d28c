//! One-off schema migration: adds the nullable `custom_type` column to the
//! `events` table plus a partial index over custom events.
//!
//! Safe to re-run; an already migrated database is reported as such.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};

pub const EVENTS_TABLE: &str = "events";
pub const CUSTOM_TYPE_COLUMN: &str = "custom_type";
pub const CUSTOM_TYPE_INDEX: &str = "idx_events_custom_type";

/// Outcome of a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// False when the column was already there.
    pub column_added: bool,
    pub index_created: bool,
    pub total_rows: i64,
    pub custom_rows: i64,
    pub rows_with_custom_type: i64,
}

/// Redact potentially sensitive information from a database URL before logging.
pub fn redact_db_url(db_url: &str) -> String {
    if let Ok(url) = url::Url::parse(db_url) {
        let host = url.host_str().unwrap_or("");
        let port_part = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
        format!("{}://{}{}{}", url.scheme(), host, port_part, url.path())
    } else if let Some(at_pos) = db_url.find('@') {
        format!("(redacted){}", &db_url[at_pos + 1..])
    } else {
        "(redacted)".to_string()
    }
}

/// Opens an existing database. A missing file is an error, never created.
pub async fn connect(config: &DatabaseConfig) -> AppResult<SqlitePool> {
    tracing::info!("Connecting to database: {}", redact_db_url(&config.url));

    let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(false);
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

async fn table_exists(pool: &SqlitePool, table: &str) -> AppResult<bool> {
    let row = sqlx::query("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
        .bind(table)
        .fetch_one(pool)
        .await?;
    Ok(row.get::<i64, _>(0) > 0)
}

async fn index_exists(pool: &SqlitePool, index: &str) -> AppResult<bool> {
    let row = sqlx::query("SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?")
        .bind(index)
        .fetch_one(pool)
        .await?;
    Ok(row.get::<i64, _>(0) > 0)
}

async fn column_names(pool: &SqlitePool, table: &str) -> AppResult<Vec<String>> {
    // PRAGMA arguments cannot be bound; `table` is one of our constants.
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(|r| r.get::<String, _>("name")).collect())
}

async fn count(pool: &SqlitePool, sql: &str) -> AppResult<i64> {
    let row = sqlx::query(sql).fetch_one(pool).await?;
    Ok(row.get::<i64, _>(0))
}

pub async fn add_custom_type_column(pool: &SqlitePool) -> AppResult<MigrationReport> {
    if !table_exists(pool, EVENTS_TABLE).await? {
        return Err(AppError::NotFound(format!("table {}", EVENTS_TABLE)));
    }

    let has_column = column_names(pool, EVENTS_TABLE)
        .await?
        .iter()
        .any(|c| c == CUSTOM_TYPE_COLUMN);
    let had_index = index_exists(pool, CUSTOM_TYPE_INDEX).await?;

    let mut tx = pool.begin().await?;
    if has_column {
        tracing::info!("Column {}.{} already exists", EVENTS_TABLE, CUSTOM_TYPE_COLUMN);
    } else {
        tracing::info!("Adding column {}.{}", EVENTS_TABLE, CUSTOM_TYPE_COLUMN);
        sqlx::query("ALTER TABLE events ADD COLUMN custom_type TEXT")
            .execute(&mut *tx)
            .await?;
    }
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_events_custom_type ON events(custom_type) \
         WHERE type = 'custom'",
    )
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    // Verify against the catalog rather than trusting the statements.
    let columns = column_names(pool, EVENTS_TABLE).await?;
    if !columns.iter().any(|c| c == CUSTOM_TYPE_COLUMN) {
        return Err(AppError::Internal(anyhow::anyhow!(
            "column {} missing after migration",
            CUSTOM_TYPE_COLUMN
        )));
    }
    if !index_exists(pool, CUSTOM_TYPE_INDEX).await? {
        return Err(AppError::Internal(anyhow::anyhow!(
            "index {} missing after migration",
            CUSTOM_TYPE_INDEX
        )));
    }

    let report = MigrationReport {
        column_added: !has_column,
        index_created: !had_index,
        total_rows: count(pool, "SELECT COUNT(*) FROM events").await?,
        custom_rows: count(pool, "SELECT COUNT(*) FROM events WHERE type = 'custom'").await?,
        rows_with_custom_type: count(
            pool,
            "SELECT COUNT(*) FROM events WHERE custom_type IS NOT NULL",
        )
        .await?,
    };

    tracing::info!(
        "Migration verified: {} rows, {} custom, {} with custom_type",
        report.total_rows,
        report.custom_rows,
        report.rows_with_custom_type
    );
    Ok(report)
}
