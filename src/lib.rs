//! seeq - search history time series from Google Takeout exports.
//!
//! This library turns the search-activity part of a Takeout archive into a
//! time series of per-window query word counts.
//!
//! # Privacy Guarantees
//!
//! - **Local only**: Archives are read from disk and never sent anywhere
//! - **Counts only**: The output holds token counts per window, not queries
//!   in order or in context
//! - **No state**: Nothing from an archive is kept once a run finishes
//! - **Transparency**: Every run is counted in an auditable log
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                            seeq                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Extractor  │──▶│  Windowing  │──▶│  Document   │       │
//! │  │   (ZIP)     │   │ (histograms)│   │   (JSON)    │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                 │                                  │
//! │         ▼                 ▼                                  │
//! │  ┌──────────────────────────────┐                           │
//! │  │       Transparency Log       │                           │
//! │  └──────────────────────────────┘                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use seeq::{aggregate, extractor, AggregationConfig};
//!
//! let config = AggregationConfig::parse("day", "words").expect("valid options");
//! let mut events = extractor::extract_path("takeout.zip")
//!     .expect("readable archive")
//!     .events;
//! events.sort_by_timestamp();
//!
//! let series = aggregate(events.as_slice(), &config, Utc::now()).expect("events present");
//! println!("{} windows", series.len());
//! ```

pub mod config;
pub mod core;
pub mod extractor;
pub mod pipeline;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use config::{AggregationConfig, Config, ConfigError, Granularity, Tokenization};
pub use core::{
    aggregate, tokenize, AggregateError, Aggregator, Histogram, SearchDataDocument, TimeSeries,
    WindowCursor,
};
pub use extractor::{ArchiveExtractor, Event, EventSet, ExtractError, ExtractorConfig};
pub use pipeline::{Pipeline, ProcessError, ProcessOutput};
pub use transparency::{TransparencyError, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Privacy declaration that can be displayed to users.
pub const PRIVACY_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                  SEEQ - PRIVACY DECLARATION                      ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  seeq summarizes your Google search history for research.        ║
║                                                                  ║
║  ✓ WHAT WE READ:                                                 ║
║    • Search entries of the Takeout archive you provide           ║
║    • The time of each search and its query text                  ║
║                                                                  ║
║  ✓ WHAT WE WRITE:                                                ║
║    • Word (or whole query) counts per hour/day/week/month/year   ║
║    • A small metadata file describing the output                 ║
║                                                                  ║
║  ✗ WHAT WE NEVER DO:                                             ║
║    • Read any other part of your archive                         ║
║    • Send anything over the network                              ║
║    • Keep a copy of your queries after the run                   ║
║                                                                  ║
║  You can view processing statistics anytime with:                ║
║    seeq status                                                   ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
