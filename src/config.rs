//! TOML configuration for the harvester.
//!
//! Every section is optional: a missing file section falls back to the
//! defaults below, and `tdlr` runs without any config file at all. CLI
//! flags are layered on top by [`Config::with_overrides`].
//!
//! The defaults, spelled out:
//!
//! ```toml
//! [db]
//! path = "tdlr_projects.db"
//!
//! [source]
//! base_url = "https://www.tdlr.texas.gov"
//! search_path = "/TABS/Search/SearchProjects"
//! timeout_secs = 30
//! max_retries = 3
//! retry_backoff_ms = 1000
//!
//! [scrape]
//! batch_size = 15
//! delay_secs = 1.0
//! # max_records = 500   # unset means no limit
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Hard page-size ceiling enforced by the TABS search endpoint.
pub const MAX_PAGE_SIZE: u32 = 15;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tdlr_projects.db")
}

/// Remote endpoint settings.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_search_path")]
    pub search_path: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts per page after a transient failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Lower bound for the pause before a retry, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_path: default_search_path(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl SourceConfig {
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.search_path.trim_start_matches('/')
        )
    }
}

fn default_base_url() -> String {
    "https://www.tdlr.texas.gov".to_string()
}
fn default_search_path() -> String {
    "/TABS/Search/SearchProjects".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrapeConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,
    #[serde(default)]
    pub max_records: Option<i64>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            delay_secs: default_delay_secs(),
            max_records: None,
        }
    }
}

fn default_batch_size() -> u32 {
    MAX_PAGE_SIZE
}
fn default_delay_secs() -> f64 {
    1.0
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db_path: Option<PathBuf>,
    pub batch_size: Option<u32>,
    pub delay_secs: Option<f64>,
    pub max_records: Option<i64>,
}

impl Config {
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(path) = overrides.db_path {
            self.db.path = path;
        }
        if let Some(batch_size) = overrides.batch_size {
            self.scrape.batch_size = batch_size;
        }
        if let Some(delay) = overrides.delay_secs {
            self.scrape.delay_secs = delay;
        }
        if overrides.max_records.is_some() {
            self.scrape.max_records = overrides.max_records;
        }
        self
    }

    /// Checks the values the file format cannot express on its own.
    ///
    /// Scrape limits (`batch_size`, `max_records`) are validated by the
    /// ingestor so that library callers get the same checks.
    pub fn validate(&self) -> Result<()> {
        if self.source.timeout_secs == 0 {
            bail!("source.timeout_secs must be > 0");
        }
        if !self.scrape.delay_secs.is_finite() || self.scrape.delay_secs < 0.0 {
            bail!(
                "scrape.delay_secs must be a non-negative number, got {}",
                self.scrape.delay_secs
            );
        }
        if !self.source.base_url.starts_with("http://")
            && !self.source.base_url.starts_with("https://")
        {
            bail!(
                "source.base_url must be an http(s) URL, got '{}'",
                self.source.base_url
            );
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load the config file if one was given, otherwise use defaults.
pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<Config> {
    let base = match path {
        Some(p) => load_config(p)?,
        None => Config::default(),
    };
    let config = base.with_overrides(overrides);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENTED_DEFAULTS: &str = r#"
[db]
path = "tdlr_projects.db"

[source]
base_url = "https://www.tdlr.texas.gov"
search_path = "/TABS/Search/SearchProjects"
timeout_secs = 30
max_retries = 3
retry_backoff_ms = 1000

[scrape]
batch_size = 15
delay_secs = 1.0
# max_records = 500   # unset means no limit
"#;

    #[test]
    fn documented_defaults_are_the_real_defaults() {
        let written: Config = toml::from_str(DOCUMENTED_DEFAULTS).unwrap();
        let default = Config::default();

        assert_eq!(written.db.path, default.db.path);
        assert_eq!(written.source.base_url, default.source.base_url);
        assert_eq!(written.source.search_path, default.source.search_path);
        assert_eq!(written.source.timeout_secs, default.source.timeout_secs);
        assert_eq!(written.source.max_retries, default.source.max_retries);
        assert_eq!(written.source.retry_backoff_ms, default.source.retry_backoff_ms);
        assert_eq!(written.scrape.batch_size, default.scrape.batch_size);
        assert_eq!(written.scrape.delay_secs, default.scrape.delay_secs);
        assert_eq!(written.scrape.max_records, default.scrape.max_records);
        assert!(default.scrape.max_records.is_none());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.db.path, PathBuf::from("tdlr_projects.db"));
        assert_eq!(config.scrape.batch_size, MAX_PAGE_SIZE);
        assert_eq!(config.source.max_retries, 3);
        assert!(config.scrape.max_records.is_none());
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let source = SourceConfig {
            base_url: "http://127.0.0.1:9000/".to_string(),
            ..SourceConfig::default()
        };
        assert_eq!(
            source.endpoint(),
            "http://127.0.0.1:9000/TABS/Search/SearchProjects"
        );
    }

    #[test]
    fn overrides_win_over_file_values() {
        let config: Config = toml::from_str(
            r#"
            [db]
            path = "from-file.db"

            [scrape]
            batch_size = 10
            max_records = 40
            "#,
        )
        .unwrap();
        let config = config.with_overrides(Overrides {
            db_path: Some(PathBuf::from("cli.db")),
            batch_size: None,
            delay_secs: Some(0.0),
            max_records: Some(5),
        });
        assert_eq!(config.db.path, PathBuf::from("cli.db"));
        assert_eq!(config.scrape.batch_size, 10);
        assert_eq!(config.scrape.delay_secs, 0.0);
        assert_eq!(config.scrape.max_records, Some(5));
    }

    #[test]
    fn negative_delay_is_rejected() {
        let mut config = Config::default();
        config.scrape.delay_secs = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let mut config = Config::default();
        config.source.base_url = "ftp://example.org".to_string();
        assert!(config.validate().is_err());
    }
}
