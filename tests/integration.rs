mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use axum::http::StatusCode;
use common::FakeTabs;
use tempfile::TempDir;

fn tdlr_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tdlr");
    path
}

fn setup_test_env(base_url: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_content = format!(
        r#"[db]
path = "{}/data/projects.db"

[source]
base_url = "{}"
timeout_secs = 5
max_retries = 1
retry_backoff_ms = 0

[scrape]
delay_secs = 0.0
"#,
        root.display(),
        base_url
    );

    let config_path = root.join("tdlr.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_tdlr(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = tdlr_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("TDLR_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run tdlr binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Runs the binary off the async runtime so the fake server keeps serving.
async fn run_tdlr_async(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let config_path = config_path.to_path_buf();
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_tdlr(&config_path, &args)
    })
    .await
    .unwrap()
}

#[test]
fn test_init_creates_database() {
    let (tmp, config) = setup_test_env("http://127.0.0.1:9");
    let (stdout, stderr, success) = run_tdlr(&config, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("0 projects"));
    assert!(tmp.path().join("data/projects.db").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config) = setup_test_env("http://127.0.0.1:9");
    let (_, _, first) = run_tdlr(&config, &["init"]);
    let (_, stderr, second) = run_tdlr(&config, &["init"]);
    assert!(first);
    assert!(second, "second init failed: {}", stderr);
}

#[test]
fn test_search_without_database_fails() {
    let (tmp, config) = setup_test_env("http://127.0.0.1:9");
    let (_, stderr, success) = run_tdlr(&config, &["search", "hospital"]);
    assert!(!success);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
    assert!(!tmp.path().join("data/projects.db").exists());
}

#[test]
fn test_scrape_rejects_non_positive_max_records() {
    // Port 9 (discard) is never contacted: validation happens first.
    let (tmp, config) = setup_test_env("http://127.0.0.1:9");
    for value in ["0", "-5"] {
        let (_, stderr, success) =
            run_tdlr(&config, &["scrape", "--max-records", value, "--progress", "off"]);
        assert!(!success, "max-records {} accepted", value);
        assert!(stderr.contains("max-records must be positive"), "stderr: {}", stderr);
    }
    assert!(!tmp.path().join("data/projects.db").exists());
}

#[test]
fn test_search_empty_database() {
    let (_tmp, config) = setup_test_env("http://127.0.0.1:9");
    run_tdlr(&config, &["init"]);
    let (stdout, _, success) = run_tdlr(&config, &["search", "hospital"]);
    assert!(success);
    assert!(stdout.contains("No projects found"));
    assert!(stdout.contains("tdlr scrape"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scrape_then_search() {
    let tabs = FakeTabs::with_projects(40);
    let base = tabs.spawn().await;
    let (_tmp, config) = setup_test_env(&base);

    let (stdout, stderr, success) = run_tdlr_async(
        &config,
        &["scrape", "--max-records", "30", "--progress", "off"],
    )
    .await;
    assert!(success, "scrape failed: {}", stderr);
    assert!(stdout.contains("records written: 30"), "stdout: {}", stdout);
    assert!(stdout.contains("ok"));
    assert_eq!(tabs.requests().len(), 2);

    let (stdout, _, success) = run_tdlr_async(&config, &["search", "hospital"]).await;
    assert!(success);
    assert!(stdout.contains("Found 15 projects:"), "stdout: {}", stdout);
    assert!(stdout.contains("City Hospital"));

    let (stdout, _, success) =
        run_tdlr_async(&config, &["search", "TABS0000", "--format", "json"]).await;
    assert!(success);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["count"], 10);
    assert_eq!(json["matches"][0]["project_id"], "p-0");

    let (stdout, _, success) = run_tdlr_async(&config, &["stats"]).await;
    assert!(success);
    assert!(stdout.contains("Projects:      30"), "stdout: {}", stdout);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scrape_dry_run_leaves_no_database() {
    let tabs = FakeTabs::with_projects(10);
    let base = tabs.spawn().await;
    let (tmp, config) = setup_test_env(&base);

    let (stdout, stderr, success) =
        run_tdlr_async(&config, &["scrape", "--dry-run", "--progress", "off"]).await;
    assert!(success, "dry run failed: {}", stderr);
    assert!(stdout.contains("records fetched: 10"), "stdout: {}", stdout);
    assert!(!tmp.path().join("data/projects.db").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scrape_failure_exits_nonzero_with_partial_report() {
    let tabs = FakeTabs::with_projects(40);
    let base = tabs.spawn().await;
    let (_tmp, config) = setup_test_env(&base);

    tabs.fail_next(StatusCode::NOT_FOUND);
    let (stdout, stderr, success) =
        run_tdlr_async(&config, &["scrape", "--progress", "off"]).await;
    assert!(!success);
    assert!(stdout.contains("records written: 0"), "stdout: {}", stdout);
    assert!(stderr.contains("404"), "stderr: {}", stderr);
}
