//! Scrape progress reporting.
//!
//! Reports each page as it lands so users can watch a long scrape advance.
//! Progress goes to **stderr** so the final report on stdout stays
//! parseable for scripts.

use std::io::Write;

/// A single progress event emitted by the ingestor.
#[derive(Clone, Debug, PartialEq)]
pub enum ScrapeProgressEvent {
    /// A page was fetched and written.
    Page {
        offset: u64,
        received: u64,
        written: u64,
        /// Current target: `min(max_records, reported total)` when known.
        target: Option<u64>,
    },
    /// A transient failure; the page will be requested again.
    Retrying {
        offset: u64,
        attempt: u32,
        max_attempts: u32,
        reason: String,
    },
}

/// Reports scrape progress. Implementations write to stderr (human or JSON).
pub trait ScrapeProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the ingest loop.
    fn report(&self, event: ScrapeProgressEvent);
}

/// Human-friendly progress on stderr: "scrape  page @ 30  +15  45 / 4,321 records".
pub struct StderrProgress;

impl ScrapeProgressReporter for StderrProgress {
    fn report(&self, event: ScrapeProgressEvent) {
        let line = match &event {
            ScrapeProgressEvent::Page {
                offset,
                received,
                written,
                target,
            } => {
                let target_fmt = target
                    .map(format_number)
                    .unwrap_or_else(|| "?".to_string());
                format!(
                    "scrape  page @ {}  +{}  {} / {} records\n",
                    format_number(*offset),
                    received,
                    format_number(*written),
                    target_fmt
                )
            }
            ScrapeProgressEvent::Retrying {
                offset,
                attempt,
                max_attempts,
                reason,
            } => format!(
                "scrape  page @ {}  retry {}/{}  ({})\n",
                format_number(*offset),
                attempt,
                max_attempts,
                reason
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ScrapeProgressReporter for JsonProgress {
    fn report(&self, event: ScrapeProgressEvent) {
        let obj = match &event {
            ScrapeProgressEvent::Page {
                offset,
                received,
                written,
                target,
            } => serde_json::json!({
                "event": "page",
                "offset": offset,
                "received": received,
                "written": written,
                "target": target
            }),
            ScrapeProgressEvent::Retrying {
                offset,
                attempt,
                max_attempts,
                reason,
            } => serde_json::json!({
                "event": "retry",
                "offset": offset,
                "attempt": attempt,
                "max_attempts": max_attempts,
                "reason": reason
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ScrapeProgressReporter for NoProgress {
    fn report(&self, _event: ScrapeProgressEvent) {}
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    /// Human output when stderr is a terminal, otherwise off.
    Auto,
    Off,
    Human,
    Json,
}

impl ProgressMode {
    pub fn resolve(self) -> Self {
        match self {
            ProgressMode::Auto => {
                if atty::is(atty::Stream::Stderr) {
                    ProgressMode::Human
                } else {
                    ProgressMode::Off
                }
            }
            other => other,
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ScrapeProgressReporter> {
        match self.resolve() {
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
            ProgressMode::Off | ProgressMode::Auto => Box::new(NoProgress),
        }
    }
}
