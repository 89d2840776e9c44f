//! Remote project source.
//!
//! [`RemoteSource`] is the seam between the ingestor and the network:
//! given an offset and a page size it returns one [`Page`] or a classified
//! [`FetchError`]. [`HttpSource`] talks to the TABS project search
//! endpoint, a DataTables-style JSON API:
//!
//! ```text
//! POST /TABS/Search/SearchProjects
//! {"draw": 1, "start": 30, "length": 15, "search-type": "default"}
//!
//! 200 OK
//! {"recordsTotal": 4321, "data": [{"ProjectId": "...", ...}, ...]}
//! ```
//!
//! # Failure classification
//!
//! - Network errors and timeouts → [`FetchError::Transient`]
//! - HTTP 429 and 5xx → [`FetchError::Transient`]
//! - Any other non-2xx → [`FetchError::Rejected`]
//! - Unparseable JSON or no `data` array → [`FetchError::Malformed`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Deserialize;
use tracing::debug;

use crate::config::SourceConfig;
use crate::error::FetchError;
use crate::models::{Page, RawProject};

/// Which slice of the remote collection to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    pub size: u32,
}

#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn fetch_page(&self, request: PageRequest) -> Result<Page, FetchError>;
}

/// Wire shape of a search response.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<Vec<RawProject>>,
    #[serde(default, rename = "recordsTotal")]
    records_total: Option<u64>,
}

/// Parse a response body into a [`Page`].
pub fn parse_page(body: &[u8]) -> Result<Page, FetchError> {
    let response: SearchResponse = serde_json::from_slice(body)
        .map_err(|e| FetchError::Malformed(format!("invalid JSON: {}", e)))?;

    let records = response
        .data
        .ok_or_else(|| FetchError::Malformed("response has no data array".to_string()))?;

    Ok(Page {
        records,
        total: response.records_total,
    })
}

/// [`RemoteSource`] backed by the TABS HTTP endpoint.
pub struct HttpSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSource {
    pub fn new(config: &SourceConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn fetch_page(&self, request: PageRequest) -> Result<Page, FetchError> {
        let body = serde_json::json!({
            "draw": 1,
            "start": request.offset,
            "length": request.size,
            "search-type": "default",
        });

        debug!(endpoint = %self.endpoint, offset = request.offset, size = request.size, "POST page");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let body_text = truncate(&body_text, 200);

            // Rate limited or server error: retry
            if status.as_u16() == 429 || status.is_server_error() {
                return Err(FetchError::Transient(format!("HTTP {}: {}", status, body_text)));
            }

            return Err(FetchError::Rejected {
                status: status.as_u16(),
                body: body_text,
            });
        }

        // A body that times out mid-read is a network problem, not bad JSON.
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        parse_page(&bytes)
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records_and_total() {
        let page = parse_page(
            br#"{"draw":1,"recordsTotal":100,"recordsFiltered":100,
                "data":[{"ProjectId":"a"},{"ProjectId":"b","City":5}]}"#,
        )
        .unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.total, Some(100));
    }

    #[test]
    fn missing_total_is_tolerated() {
        let page = parse_page(br#"{"data":[]}"#).unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.total, None);
    }

    #[test]
    fn missing_or_null_data_is_malformed() {
        for body in [&br#"{"recordsTotal":3}"#[..], br#"{"data":null}"#] {
            let err = parse_page(body).unwrap_err();
            assert!(matches!(err, FetchError::Malformed(_)), "{err}");
        }
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = parse_page(b"<html>Service Unavailable</html>").unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn non_object_record_is_malformed() {
        let err = parse_page(br#"{"data":[1,2,3]}"#).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }
}
