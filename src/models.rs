//! Core data models used throughout the harvester.
//!
//! Records flow through three shapes: [`RawProject`] as the TABS endpoint
//! sends it, [`Project`] after normalization, and [`StoredProject`] once the
//! store has stamped it with a scrape time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A project record exactly as the remote endpoint returns it.
///
/// Every field is optional and kept as a loose JSON value; the endpoint is
/// not consistent about sending codes as numbers or strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawProject {
    #[serde(default)]
    pub project_id: Option<Value>,
    #[serde(default)]
    pub project_number: Option<Value>,
    #[serde(default)]
    pub project_name: Option<Value>,
    #[serde(default)]
    pub project_created_on: Option<Value>,
    #[serde(default)]
    pub project_status: Option<Value>,
    #[serde(default)]
    pub facility_name: Option<Value>,
    #[serde(default)]
    pub city: Option<Value>,
    #[serde(default)]
    pub county: Option<Value>,
    #[serde(default)]
    pub type_of_work: Option<Value>,
    #[serde(default)]
    pub estimated_cost: Option<Value>,
    #[serde(default)]
    pub data_version_id: Option<Value>,
    #[serde(default)]
    pub estimated_start_date: Option<Value>,
    #[serde(default)]
    pub estimated_end_date: Option<Value>,
}

/// One page returned by a [`RemoteSource`](crate::source::RemoteSource).
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<RawProject>,
    /// The source's current idea of how many records exist, if it said.
    pub total: Option<u64>,
}

/// Normalized project record, the unit of storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    pub project_id: String,
    pub project_number: Option<String>,
    pub project_name: Option<String>,
    pub project_created_on: Option<String>,
    pub project_status: Option<String>,
    pub facility_name: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub type_of_work: Option<String>,
    pub estimated_cost: Option<f64>,
    pub data_version_id: Option<String>,
    pub estimated_start_date: Option<String>,
    pub estimated_end_date: Option<String>,
}

impl Project {
    /// A record with only its identifier set.
    pub fn with_id(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            project_number: None,
            project_name: None,
            project_created_on: None,
            project_status: None,
            facility_name: None,
            city: None,
            county: None,
            type_of_work: None,
            estimated_cost: None,
            data_version_id: None,
            estimated_start_date: None,
            estimated_end_date: None,
        }
    }

    /// Case-insensitive substring match over the searchable text columns.
    pub fn matches(&self, term: &str) -> bool {
        if term.is_empty() {
            return true;
        }
        let needle = term.to_lowercase();
        [
            &self.project_number,
            &self.project_name,
            &self.facility_name,
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// A project as read back from the store.
#[derive(Debug, Clone, Serialize)]
pub struct StoredProject {
    #[serde(flatten)]
    pub project: Project,
    pub date_scraped: DateTime<Utc>,
}
