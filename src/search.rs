//! Read-only project search.
//!
//! [`Searcher`] wraps any [`ProjectStore`] and never writes to it. The CLI
//! entry point [`run_search`] opens an existing database, runs the query,
//! and renders either a fixed-width table or JSON.

use anyhow::Result;
use serde::Serialize;

use crate::config::Config;
use crate::models::StoredProject;
use crate::store::sqlite::SqliteStore;
use crate::store::ProjectStore;

/// Rows printed in table mode before summarizing the rest.
pub const DISPLAY_ROWS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub term: String,
    pub count: usize,
    pub matches: Vec<StoredProject>,
}

pub struct Searcher<'a> {
    store: &'a dyn ProjectStore,
}

impl<'a> Searcher<'a> {
    pub fn new(store: &'a dyn ProjectStore) -> Self {
        Self { store }
    }

    pub async fn search(&self, term: &str, limit: Option<usize>) -> Result<SearchResults> {
        let matches = self.store.search(term, limit).await?;
        Ok(SearchResults {
            term: term.to_string(),
            count: matches.len(),
            matches,
        })
    }
}

/// CLI entry point for `tdlr search`.
pub async fn run_search(
    config: &Config,
    term: &str,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let store = SqliteStore::open_existing(&config.db.path).await?;
    let results = Searcher::new(&store).search(term, limit).await;
    store.close().await;
    let results = results?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Text => print!("{}", render_table(&results, DISPLAY_ROWS)),
    }
    Ok(())
}

/// Render matches as the fixed-width table printed by `tdlr search`.
pub fn render_table(results: &SearchResults, max_rows: usize) -> String {
    if results.matches.is_empty() {
        return format!(
            "No projects found matching '{}'.\n\
             Note: you may need to run `tdlr scrape` first to populate the database.\n",
            results.term
        );
    }

    let mut out = String::new();
    out.push_str(&format!("Found {} projects:\n", results.count));
    out.push_str(&"-".repeat(100));
    out.push('\n');

    let header = format!(
        "{:<36} {:<15} {:<20} {:<20}",
        "Project ID", "Project Number", "Facility Name", "Project Name"
    );
    out.push_str(&header);
    out.push('\n');
    out.push_str(&"-".repeat(header.len()));
    out.push('\n');

    for row in results.matches.iter().take(max_rows) {
        let p = &row.project;
        out.push_str(&format!(
            "{:<36} {:<15} {:<20} {:<20}\n",
            clip(Some(&p.project_id), 35),
            clip(p.project_number.as_deref(), 14),
            clip(p.facility_name.as_deref(), 19),
            clip(p.project_name.as_deref(), 19),
        ));
    }

    if results.matches.len() > max_rows {
        out.push_str(&format!(
            "... and {} more results\n",
            results.matches.len() - max_rows
        ));
    }
    out
}

fn clip(value: Option<&str>, max_chars: usize) -> String {
    value
        .unwrap_or("")
        .chars()
        .take(max_chars)
        .collect()
}
