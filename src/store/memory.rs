//! In-memory [`ProjectStore`] for dry runs and tests.
//!
//! Rows live in a `Vec` behind a `RwLock`; an index map from `project_id`
//! to position keeps upserts in place so insertion order survives updates.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use crate::models::{Project, StoredProject};

use super::ProjectStore;

#[derive(Default)]
struct Rows {
    rows: Vec<StoredProject>,
    by_id: HashMap<String, usize>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Rows>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for InMemoryStore {
    async fn upsert(&self, project: &Project) -> Result<()> {
        let stored = StoredProject {
            project: project.clone(),
            date_scraped: Utc::now(),
        };
        let mut inner = self.inner.write().unwrap();
        match inner.by_id.get(&project.project_id).copied() {
            Some(pos) => inner.rows[pos] = stored,
            None => {
                let pos = inner.rows.len();
                inner.by_id.insert(project.project_id.clone(), pos);
                inner.rows.push(stored);
            }
        }
        Ok(())
    }

    async fn search(&self, term: &str, limit: Option<usize>) -> Result<Vec<StoredProject>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .rows
            .iter()
            .filter(|row| row.project.matches(term))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn get(&self, project_id: &str) -> Result<Option<StoredProject>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .by_id
            .get(project_id)
            .map(|&pos| inner.rows[pos].clone()))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.inner.read().unwrap().rows.len() as u64)
    }
}
