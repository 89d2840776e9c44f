//! Storage abstraction for harvested projects.
//!
//! The [`ProjectStore`] trait is the only thing the ingestor and the
//! searcher share. [`SqliteStore`](sqlite::SqliteStore) is the persistent
//! backend; [`InMemoryStore`](memory::InMemoryStore) backs dry runs and
//! tests.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`upsert`](ProjectStore::upsert) | Insert or fully replace a project by `project_id` |
//! | [`search`](ProjectStore::search) | Substring search over number, name and facility |
//! | [`get`](ProjectStore::get) | Fetch one project by id |
//! | [`count`](ProjectStore::count) | Number of stored projects |

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Project, StoredProject};

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Insert the project, or replace every field of the row with the same
    /// `project_id`. Stamps `date_scraped` with the current time.
    async fn upsert(&self, project: &Project) -> Result<()>;

    /// Case-insensitive substring match on `project_number`, `project_name`
    /// and `facility_name`, in insertion order. An empty term matches all.
    async fn search(&self, term: &str, limit: Option<usize>) -> Result<Vec<StoredProject>>;

    async fn get(&self, project_id: &str) -> Result<Option<StoredProject>>;

    async fn count(&self) -> Result<u64>;
}
