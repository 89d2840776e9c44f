//! Database statistics.
//!
//! A quick look at what a scrape left behind: row count, the most recent
//! and oldest scrape timestamps, file size, and a handful of sample rows.
//! Used by `tdlr stats` to confirm a scrape actually populated the table.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::models::StoredProject;
use crate::store::sqlite::SqliteStore;
use crate::store::ProjectStore;

/// Rows shown under "Sample".
const SAMPLE_ROWS: usize = 5;

#[derive(Debug)]
pub struct DbStats {
    pub total: u64,
    pub newest_scrape: Option<DateTime<Utc>>,
    pub oldest_scrape: Option<DateTime<Utc>>,
    pub size_bytes: u64,
    pub sample: Vec<StoredProject>,
}

pub async fn collect_stats(store: &SqliteStore, db_path: &Path) -> Result<DbStats> {
    let total = store.count().await?;

    let (newest, oldest): (Option<String>, Option<String>) =
        sqlx::query_as("SELECT MAX(date_scraped), MIN(date_scraped) FROM projects")
            .fetch_one(store.pool())
            .await?;

    let sample = store.search("", Some(SAMPLE_ROWS)).await?;

    let size_bytes = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    Ok(DbStats {
        total,
        newest_scrape: newest.as_deref().and_then(parse_ts),
        oldest_scrape: oldest.as_deref().and_then(parse_ts),
        size_bytes,
        sample,
    })
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open_existing(&config.db.path).await?;
    let stats = collect_stats(&store, &config.db.path).await;
    store.close().await;
    let stats = stats?;

    println!("TDLR Projects, Database Stats");
    println!("=============================");
    println!();
    println!("  Database:      {}", config.db.path.display());
    println!("  Size:          {}", format_bytes(stats.size_bytes));
    println!("  Projects:      {}", stats.total);
    println!("  Last scraped:  {}", format_ts(stats.newest_scrape));
    println!("  First scraped: {}", format_ts(stats.oldest_scrape));

    if !stats.sample.is_empty() {
        println!();
        println!("  Sample:");
        println!("  {:<16} {:<32} {}", "NUMBER", "NAME", "FACILITY");
        println!("  {}", "-".repeat(76));
        for row in &stats.sample {
            let p = &row.project;
            println!(
                "  {:<16} {:<32} {}",
                p.project_number.as_deref().unwrap_or("-"),
                p.project_name
                    .as_deref()
                    .unwrap_or("-")
                    .chars()
                    .take(31)
                    .collect::<String>(),
                p.facility_name.as_deref().unwrap_or("-"),
            );
        }
    }
    println!();

    Ok(())
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn format_ts(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "never".to_string(),
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
