//! Raw TABS record → [`Project`].
//!
//! The endpoint sends loosely typed JSON: codes arrive as numbers or
//! strings, dates as whatever string the backend produced. Text and code
//! columns keep the textual form of any scalar; `EstimatedCost` must be
//! numeric or it is dropped.

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::error::NormalizeError;
use crate::models::{Project, RawProject};

/// Turn a raw record into the fixed [`Project`] shape.
///
/// The identifier is `ProjectId` when present. Otherwise a UUIDv5 is
/// derived from `ProjectNumber`, so repeated runs still land on the same
/// row. A record with neither cannot be deduplicated and is rejected.
pub fn normalize(raw: &RawProject) -> Result<Project, NormalizeError> {
    let project_number = text(&raw.project_number);

    let project_id = match text(&raw.project_id) {
        Some(id) => id,
        None => match &project_number {
            Some(number) => derived_id(number),
            None => return Err(NormalizeError::MissingIdentifier),
        },
    };

    Ok(Project {
        estimated_cost: cost(&project_id, &raw.estimated_cost),
        project_id,
        project_number,
        project_name: text(&raw.project_name),
        project_created_on: text(&raw.project_created_on),
        project_status: text(&raw.project_status),
        facility_name: text(&raw.facility_name),
        city: text(&raw.city),
        county: text(&raw.county),
        type_of_work: text(&raw.type_of_work),
        data_version_id: text(&raw.data_version_id),
        estimated_start_date: text(&raw.estimated_start_date),
        estimated_end_date: text(&raw.estimated_end_date),
    })
}

/// Stable identifier for records the source sent without a `ProjectId`.
pub fn derived_id(project_number: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, project_number.as_bytes()).to_string()
}

fn text(value: &Option<Value>) -> Option<String> {
    match value.as_ref()? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn cost(project_id: &str, value: &Option<Value>) -> Option<f64> {
    match value.as_ref()? {
        Value::Null => None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => match s.trim().replace([',', '$'], "").parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(project_id, value = %s, "EstimatedCost is not numeric, storing null");
                None
            }
        },
        other => {
            warn!(project_id, value = %other, "EstimatedCost is not numeric, storing null");
            None
        }
    }
}
