//! In-process stand-in for the TABS search endpoint.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

pub const SEARCH_PATH: &str = "/TABS/Search/SearchProjects";

#[derive(Default)]
struct Inner {
    records: Vec<Value>,
    failures: VecDeque<StatusCode>,
    stalls: VecDeque<Duration>,
    malformed: bool,
    requests: Vec<Value>,
    user_agents: Vec<String>,
    accepts: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeTabs {
    inner: Arc<Mutex<Inner>>,
}

impl FakeTabs {
    /// `n` projects named after their position: id `p-{i}`, number `TABS{i:05}`.
    pub fn with_projects(n: usize) -> Self {
        let records = (0..n)
            .map(|i| {
                json!({
                    "ProjectId": format!("p-{i}"),
                    "ProjectNumber": format!("TABS{i:05}"),
                    "ProjectName": if i % 2 == 0 { "Clinic Expansion" } else { "Gym Renovation" },
                    "FacilityName": if i % 2 == 0 { "City Hospital" } else { "Lamar Middle School" },
                    "City": 227,
                    "EstimatedCost": "$1,250,000.00",
                })
            })
            .collect();
        let tabs = Self::default();
        tabs.inner.lock().unwrap().records = records;
        tabs
    }

    pub fn fail_next(&self, status: StatusCode) {
        self.inner.lock().unwrap().failures.push_back(status);
    }

    /// Hold the next request for `pause` before answering it.
    pub fn stall_next(&self, pause: Duration) {
        self.inner.lock().unwrap().stalls.push_back(pause);
    }

    pub fn serve_garbage(&self) {
        self.inner.lock().unwrap().malformed = true;
    }

    /// Request bodies received so far.
    pub fn requests(&self) -> Vec<Value> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn user_agents(&self) -> Vec<String> {
        self.inner.lock().unwrap().user_agents.clone()
    }

    pub fn accepts(&self) -> Vec<String> {
        self.inner.lock().unwrap().accepts.clone()
    }

    /// Bind to an ephemeral port and return the base URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route(SEARCH_PATH, post(search_projects))
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

fn header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn search_projects(
    State(tabs): State<FakeTabs>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let stall = {
        let mut inner = tabs.inner.lock().unwrap();
        inner.requests.push(body.clone());
        inner.user_agents.push(header(&headers, "user-agent"));
        inner.accepts.push(header(&headers, "accept"));
        inner.stalls.pop_front()
    };
    if let Some(pause) = stall {
        tokio::time::sleep(pause).await;
    }

    let mut inner = tabs.inner.lock().unwrap();

    if let Some(status) = inner.failures.pop_front() {
        return (status, "upstream unavailable").into_response();
    }
    if inner.malformed {
        return (StatusCode::OK, "<html>maintenance</html>").into_response();
    }

    let start = body["start"].as_u64().unwrap_or(0) as usize;
    let length = body["length"].as_u64().unwrap_or(10) as usize;
    let total = inner.records.len();
    let end = (start + length).min(total);
    let data: Vec<Value> = if start < total {
        inner.records[start..end].to_vec()
    } else {
        Vec::new()
    };

    Json(json!({
        "draw": 1,
        "recordsTotal": total,
        "recordsFiltered": total,
        "data": data,
    }))
    .into_response()
}
