use anyhow::Result;
use sqlx::SqlitePool;

/// Create the `projects` table and its indexes. Safe to run repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id TEXT NOT NULL UNIQUE,
            project_number TEXT,
            project_name TEXT,
            project_created_on TEXT,
            project_status TEXT,
            facility_name TEXT,
            city TEXT,
            county TEXT,
            type_of_work TEXT,
            estimated_cost REAL,
            data_version_id TEXT,
            estimated_start_date TEXT,
            estimated_end_date TEXT,
            date_scraped TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_projects_project_number ON projects(project_number)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_projects_date_scraped ON projects(date_scraped DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
