//! Takeout ZIP archive reader.
//!
//! Only entries under the search directory are read. Every selected entry must
//! parse completely; a single malformed entry fails the whole extraction so
//! that no caller ever aggregates a silently truncated history.

use crate::extractor::types::{parse_timestamp_usec, Event, EventSet};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

/// Directory inside a Takeout export that holds search activity.
pub const DEFAULT_SEARCH_PREFIX: &str = "Takeout/Searches/";

/// Most bytes reserved ahead of reading one entry.
const PREALLOC_LIMIT: u64 = 1 << 20;

/// Errors raised while reading a Takeout archive.
///
/// All variants are fatal to the extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not open archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed archive: {0}")]
    Archive(#[from] ZipError),

    #[error("malformed JSON in {entry}: {source}")]
    Json {
        entry: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing field `{field}` in {entry} (event {index})")]
    MissingField {
        entry: String,
        index: usize,
        field: &'static str,
    },

    #[error("invalid timestamp_usec {value:?} in {entry} (event {index})")]
    InvalidTimestamp {
        entry: String,
        index: usize,
        value: String,
    },
}

/// Extractor settings.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Entry name prefix selecting search-activity files
    pub search_prefix: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            search_prefix: DEFAULT_SEARCH_PREFIX.to_string(),
        }
    }
}

/// Result of reading one archive.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Events in discovery order
    pub events: EventSet,
    /// Number of search entries that were read
    pub entries_read: usize,
}

#[derive(Deserialize)]
struct SearchFile {
    event: Vec<SearchRecord>,
}

#[derive(Deserialize)]
struct SearchRecord {
    query: SearchQuery,
}

#[derive(Deserialize)]
struct SearchQuery {
    id: Vec<QueryId>,
    query_text: String,
}

#[derive(Deserialize)]
struct QueryId {
    timestamp_usec: String,
}

/// Reads search events out of Takeout archives.
#[derive(Debug, Clone, Default)]
pub struct ArchiveExtractor {
    config: ExtractorConfig,
}

impl ArchiveExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Open and read the archive at `path`.
    pub fn extract_path(&self, path: impl AsRef<Path>) -> Result<Extraction, ExtractError> {
        let file = File::open(path.as_ref())?;
        self.extract(BufReader::new(file))
    }

    /// Read every search entry from an archive handle.
    pub fn extract<R: Read + Seek>(&self, reader: R) -> Result<Extraction, ExtractError> {
        let mut archive = ZipArchive::new(reader)?;
        let mut extraction = Extraction::default();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() || !entry.name().starts_with(&self.config.search_prefix) {
                continue;
            }

            let name = entry.name().to_string();
            // Declared sizes are untrusted
            let mut contents = Vec::with_capacity(entry.size().min(PREALLOC_LIMIT) as usize);
            entry.read_to_end(&mut contents)?;

            let parsed = parse_search_entry(&name, &contents)?;
            tracing::debug!(entry = %name, events = parsed.len(), "read search entry");

            extraction.events.extend(parsed);
            extraction.entries_read += 1;
        }

        Ok(extraction)
    }
}

/// Parse one search-activity JSON document into events.
pub fn parse_search_entry(name: &str, contents: &[u8]) -> Result<Vec<Event>, ExtractError> {
    let file: SearchFile = serde_json::from_slice(contents).map_err(|source| ExtractError::Json {
        entry: name.to_string(),
        source,
    })?;

    file.event
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let SearchQuery { id, query_text } = record.query;
            let id = id.into_iter().next().ok_or_else(|| ExtractError::MissingField {
                entry: name.to_string(),
                index,
                field: "id",
            })?;
            let timestamp = parse_timestamp_usec(&id.timestamp_usec).ok_or_else(|| {
                ExtractError::InvalidTimestamp {
                    entry: name.to_string(),
                    index,
                    value: id.timestamp_usec.clone(),
                }
            })?;
            Ok(Event::new(timestamp, query_text))
        })
        .collect()
}

/// Read the archive at `path` with default settings.
pub fn extract_path(path: impl AsRef<Path>) -> Result<Extraction, ExtractError> {
    ArchiveExtractor::default().extract_path(path)
}
