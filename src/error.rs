//! Error types for the ingestion core.
//!
//! Command-level code works in `anyhow`; the ingestor reports typed errors
//! so callers can tell a flaky network from an API contract change.

use thiserror::Error;

use crate::ingest::IngestReport;

/// Failure to obtain a single page from a remote source.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Timeouts, connection failures, HTTP 429 and 5xx. Worth retrying.
    #[error("transient fetch failure: {0}")]
    Transient(String),

    /// A non-retryable HTTP status.
    #[error("HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The body was not the JSON shape the endpoint is supposed to return.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

/// A raw record that cannot become a [`Project`](crate::models::Project).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("record has neither ProjectId nor ProjectNumber")]
    MissingIdentifier,
}

/// Errors that end an ingestion run.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Invalid run parameters. Raised before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Retries for one page were exhausted.
    #[error(
        "fetch at offset {offset} (batch size {batch_size}) failed after {attempts} attempt(s): {message}"
    )]
    TransientFetch {
        offset: u64,
        batch_size: u32,
        attempts: u32,
        message: String,
    },

    /// The endpoint refused the request with a status that retrying won't fix.
    #[error("fetch at offset {offset} (batch size {batch_size}) rejected with HTTP {status}: {body}")]
    FetchRejected {
        offset: u64,
        batch_size: u32,
        status: u16,
        body: String,
    },

    /// Unparseable JSON or a record missing required keys.
    #[error("malformed response at offset {offset} (batch size {batch_size}): {message}")]
    MalformedResponse {
        offset: u64,
        batch_size: u32,
        message: String,
    },

    /// The store rejected a write.
    #[error("failed to store project '{project_id}' from page at offset {offset}")]
    StoreWrite {
        project_id: String,
        offset: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl IngestError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Attach page context to a fetch failure.
    pub fn from_fetch(err: FetchError, offset: u64, batch_size: u32, attempts: u32) -> Self {
        match err {
            FetchError::Transient(message) => Self::TransientFetch {
                offset,
                batch_size,
                attempts,
                message,
            },
            FetchError::Rejected { status, body } => Self::FetchRejected {
                offset,
                batch_size,
                status,
                body,
            },
            FetchError::Malformed(message) => Self::MalformedResponse {
                offset,
                batch_size,
                message,
            },
        }
    }
}

/// A run that stopped on an error, with the work completed before it.
///
/// Records in `report.records_written` are already in the store and stay
/// there.
#[derive(Error, Debug)]
#[error(
    "scrape stopped after writing {} record(s) in {} page attempt(s)",
    .report.records_written,
    .report.pages_attempted
)]
pub struct IngestFailure {
    pub report: IngestReport,
    #[source]
    pub error: IngestError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_context_is_kept_in_message() {
        let err = IngestError::from_fetch(
            FetchError::Transient("HTTP 503".to_string()),
            45,
            15,
            4,
        );
        let msg = err.to_string();
        assert!(msg.contains("offset 45"), "{msg}");
        assert!(msg.contains("batch size 15"), "{msg}");
        assert!(msg.contains("4 attempt(s)"), "{msg}");
        assert!(msg.contains("HTTP 503"), "{msg}");
    }

    #[test]
    fn rejected_maps_to_fetch_rejected() {
        let err = IngestError::from_fetch(
            FetchError::Rejected {
                status: 404,
                body: "not here".to_string(),
            },
            0,
            15,
            1,
        );
        assert!(matches!(err, IngestError::FetchRejected { status: 404, .. }));
    }

    #[test]
    fn only_transient_is_retryable() {
        assert!(FetchError::Transient("timeout".into()).is_transient());
        assert!(!FetchError::Malformed("eof".into()).is_transient());
        assert!(!FetchError::Rejected {
            status: 400,
            body: String::new()
        }
        .is_transient());
    }
}
