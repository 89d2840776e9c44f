//! SQLite connection management.
//!
//! Connections use WAL journal mode so a `search` can read while a
//! `scrape` is writing. The database file and its parent directories are
//! created on demand for writers; readers refuse to create anything.

use anyhow::{bail, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Open (creating if needed) the database at `db_path`.
pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    pool(options).await
}

/// Open an existing database without creating it.
pub async fn connect_existing(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        bail!(
            "Database {} not found. Run `tdlr scrape` (or `tdlr init`) first.",
            db_path.display()
        );
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(false)
        .journal_mode(SqliteJournalMode::Wal);

    pool(options).await
}

async fn pool(options: SqliteConnectOptions) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
