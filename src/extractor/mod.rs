//! Event extraction from Google Takeout archives.
//!
//! This module reads the search-activity entries of a Takeout ZIP export and
//! turns them into timestamped query events.

pub mod archive;
pub mod types;

// Re-export commonly used types
pub use archive::{
    extract_path, parse_search_entry, ArchiveExtractor, ExtractError, Extraction, ExtractorConfig,
    DEFAULT_SEARCH_PREFIX,
};
pub use types::{parse_timestamp_usec, Event, EventSet};
