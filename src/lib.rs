//! # TDLR Projects
//!
//! A batch harvester for the Texas Department of Licensing and Regulation
//! (TDLR) Architectural Barriers System (TABS) project registry, with a
//! local SQLite copy that can be searched offline.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ TABS search  │──▶│   Ingestor   │──▶│    SQLite    │
//! │  (HTTP/JSON) │   │ page + retry │   │   projects   │
//! └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                              │
//!                                        ┌─────┴──────┐
//!                                        ▼            ▼
//!                                   ┌──────────┐ ┌──────────┐
//!                                   │  search  │ │  stats   │
//!                                   └──────────┘ └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tdlr init                          # create database
//! tdlr scrape --max-records 500      # harvest the newest 500 projects
//! tdlr search hospital               # substring search
//! tdlr stats                         # what's in the database
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and CLI overrides |
//! | [`models`] | Raw and normalized project records |
//! | [`normalize`] | Raw record → [`models::Project`] |
//! | [`source`] | Remote page source (HTTP) |
//! | [`ingest`] | Paginated ingestion loop |
//! | [`store`] | Upsert and search storage |
//! | [`search`] | Read-only project search |
//! | [`stats`] | Database summary |
//! | [`progress`] | Scrape progress reporting |
//! | [`error`] | Fetch and ingest error types |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod search;
pub mod source;
pub mod stats;
pub mod store;
