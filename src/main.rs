//! # TDLR Projects CLI (`tdlr`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tdlr init` | Create the SQLite database and schema |
//! | `tdlr scrape` | Harvest projects from the TABS search endpoint |
//! | `tdlr search <term>` | Substring search over stored projects |
//! | `tdlr stats` | Row count, last scrape time, and sample rows |
//!
//! ## Examples
//!
//! ```bash
//! # Harvest the newest 150 projects, two seconds between pages
//! tdlr scrape --max-records 150 --delay 2
//!
//! # Search a database somewhere else
//! tdlr --db-path ./data/projects.db search "middle school"
//!
//! # Use a config file
//! tdlr --config ./tdlr.toml scrape
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use tdlr_projects::config::{self, Overrides};
use tdlr_projects::ingest::{self, CancelFlag};
use tdlr_projects::progress::ProgressMode;
use tdlr_projects::search::{self, OutputFormat};
use tdlr_projects::stats;
use tdlr_projects::store::sqlite::SqliteStore;
use tdlr_projects::store::ProjectStore;

/// Harvest TDLR TABS project records into SQLite and search them offline.
#[derive(Parser)]
#[command(name = "tdlr", version)]
struct Cli {
    /// Path to a TOML configuration file. Every setting has a default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides `[db].path`).
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Debug logging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and schema. Safe to run repeatedly.
    Init,

    /// Fetch projects page by page and upsert them into the database.
    ///
    /// Stops at `--max-records`, at the end of the remote collection, or on
    /// Ctrl-C (after the page in flight is written).
    Scrape {
        /// Records per request. Values above 15 are clamped to 15.
        #[arg(long)]
        batch_size: Option<u32>,

        /// Seconds to pause between pages.
        #[arg(long)]
        delay: Option<f64>,

        /// Stop after this many records. Must be positive.
        #[arg(long, allow_negative_numbers = true)]
        max_records: Option<i64>,

        /// Progress output on stderr.
        #[arg(long, value_enum, default_value = "auto")]
        progress: ProgressMode,

        /// Fetch and normalize without touching the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Case-insensitive substring search over project number, project
    /// name, and facility name.
    Search {
        /// Search term. An empty string matches every project.
        term: String,

        /// Maximum number of matches to return.
        #[arg(long, default_value_t = 100)]
        limit: usize,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Summarize what the database holds.
    Stats,
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "tdlr_projects=debug,info"
    } else {
        "tdlr_projects=info,warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("TDLR_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let mut overrides = Overrides {
        db_path: cli.db_path,
        ..Overrides::default()
    };
    if let Commands::Scrape {
        batch_size,
        delay,
        max_records,
        ..
    } = &cli.command
    {
        overrides.batch_size = *batch_size;
        overrides.delay_secs = *delay;
        overrides.max_records = *max_records;
    }

    let cfg = config::resolve(cli.config.as_deref(), overrides)?;

    match cli.command {
        Commands::Init => {
            let store = SqliteStore::open(&cfg.db.path).await?;
            let count = store.count().await;
            store.close().await;
            println!(
                "Database ready at {} ({} projects).",
                cfg.db.path.display(),
                count?
            );
        }
        Commands::Scrape {
            progress, dry_run, ..
        } => {
            let cancel = CancelFlag::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("interrupt received, finishing current page...");
                    on_signal.cancel();
                }
            });
            ingest::run_scrape(&cfg, progress, dry_run, cancel).await?;
        }
        Commands::Search {
            term,
            limit,
            format,
        } => {
            search::run_search(&cfg, &term, Some(limit), format).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
