//! SQLite-backed [`ProjectStore`].
//!
//! One table, `projects`, with a unique constraint on `project_id`.
//! Upserts use `ON CONFLICT ... DO UPDATE` so the rowid (and therefore
//! insertion order) of an existing project is preserved. Each upsert is a
//! single statement and therefore atomic.
//!
//! Search walks the table in insertion order and filters each row with
//! [`Project::matches`], the same Unicode case folding the in-memory store
//! uses. `LIKE` would only fold ASCII letters.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db;
use crate::migrate;
use crate::models::{Project, StoredProject};

use super::ProjectStore;

const COLUMNS: &str = "project_id, project_number, project_name, project_created_on, \
    project_status, facility_name, city, county, type_of_work, estimated_cost, \
    data_version_id, estimated_start_date, estimated_end_date, date_scraped";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open for writing: creates the file and schema when missing.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = db::connect(db_path).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Open an existing database for reading. Never creates or migrates.
    pub async fn open_existing(db_path: &Path) -> Result<Self> {
        let pool = db::connect_existing(db_path).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn row_to_project(row: &SqliteRow) -> Result<StoredProject> {
    let scraped: String = row.get("date_scraped");
    let date_scraped = DateTime::parse_from_rfc3339(&scraped)
        .with_context(|| format!("invalid date_scraped value '{}'", scraped))?
        .with_timezone(&Utc);

    Ok(StoredProject {
        project: Project {
            project_id: row.get("project_id"),
            project_number: row.get("project_number"),
            project_name: row.get("project_name"),
            project_created_on: row.get("project_created_on"),
            project_status: row.get("project_status"),
            facility_name: row.get("facility_name"),
            city: row.get("city"),
            county: row.get("county"),
            type_of_work: row.get("type_of_work"),
            estimated_cost: row.get("estimated_cost"),
            data_version_id: row.get("data_version_id"),
            estimated_start_date: row.get("estimated_start_date"),
            estimated_end_date: row.get("estimated_end_date"),
        },
        date_scraped,
    })
}

#[async_trait]
impl ProjectStore for SqliteStore {
    async fn upsert(&self, project: &Project) -> Result<()> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        sqlx::query(
            r#"
            INSERT INTO projects (project_id, project_number, project_name, project_created_on,
                                  project_status, facility_name, city, county, type_of_work,
                                  estimated_cost, data_version_id, estimated_start_date,
                                  estimated_end_date, date_scraped)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(project_id) DO UPDATE SET
                project_number = excluded.project_number,
                project_name = excluded.project_name,
                project_created_on = excluded.project_created_on,
                project_status = excluded.project_status,
                facility_name = excluded.facility_name,
                city = excluded.city,
                county = excluded.county,
                type_of_work = excluded.type_of_work,
                estimated_cost = excluded.estimated_cost,
                data_version_id = excluded.data_version_id,
                estimated_start_date = excluded.estimated_start_date,
                estimated_end_date = excluded.estimated_end_date,
                date_scraped = excluded.date_scraped
            "#,
        )
        .bind(&project.project_id)
        .bind(&project.project_number)
        .bind(&project.project_name)
        .bind(&project.project_created_on)
        .bind(&project.project_status)
        .bind(&project.facility_name)
        .bind(&project.city)
        .bind(&project.county)
        .bind(&project.type_of_work)
        .bind(project.estimated_cost)
        .bind(&project.data_version_id)
        .bind(&project.estimated_start_date)
        .bind(&project.estimated_end_date)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn search(&self, term: &str, limit: Option<usize>) -> Result<Vec<StoredProject>> {
        let limit = limit.unwrap_or(usize::MAX);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT {} FROM projects ORDER BY id ASC", COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut matches = Vec::new();
        for row in &rows {
            let stored = row_to_project(row)?;
            if stored.project.matches(term) {
                matches.push(stored);
                if matches.len() >= limit {
                    break;
                }
            }
        }
        Ok(matches)
    }

    async fn get(&self, project_id: &str) -> Result<Option<StoredProject>> {
        let sql = format!("SELECT {} FROM projects WHERE project_id = ?", COLUMNS);
        let row = sqlx::query(&sql)
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_project).transpose()
    }

    async fn count(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }
}
