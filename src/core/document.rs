//! Output document for a finished aggregation.
//!
//! The document is the unit handed to whatever delivers the data elsewhere:
//!
//! ```json
//! {"granularity": "hour", "search-data-format": "words",
//!  "data": {"2017-03-04T05:00:00+00:00": {"cats": 1}}}
//! ```
//!
//! `data` keys are written in chronological order.

use crate::config::{AggregationConfig, Granularity, Tokenization};
use crate::core::aggregate::TimeSeries;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default file name of the output document.
pub const DOCUMENT_FILENAME: &str = "google-search-data.json";

/// Suffix of the metadata sidecar written next to the document.
pub const METADATA_SUFFIX: &str = ".metadata.json";

/// Aggregated search data ready for delivery.
#[derive(Debug, Clone, Serialize)]
pub struct SearchDataDocument {
    pub granularity: Granularity,
    #[serde(rename = "search-data-format")]
    pub search_data_format: Tokenization,
    pub data: TimeSeries,
}

/// File metadata describing the document to the receiving side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub description: String,
    pub tags: Vec<String>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            description: "Google search data".to_string(),
            tags: vec!["json".to_string()],
        }
    }
}

/// Paths of a written document and its sidecar.
#[derive(Debug, Clone)]
pub struct WrittenDocument {
    pub path: PathBuf,
    pub metadata_path: PathBuf,
}

impl SearchDataDocument {
    pub fn new(config: &AggregationConfig, data: TimeSeries) -> Self {
        Self {
            granularity: config.granularity,
            search_data_format: config.tokenization,
            data,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the document to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), std::io::Error> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self).map_err(std::io::Error::other)?;
        writer.flush()
    }

    /// Write the document and its metadata sidecar into `dir`.
    pub fn write_into(
        &self,
        dir: &Path,
        file_name: &str,
        metadata: &DocumentMetadata,
    ) -> Result<WrittenDocument, std::io::Error> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join(file_name);
        self.write_to(&path)?;

        let metadata_path = dir.join(format!("{file_name}{METADATA_SUFFIX}"));
        let json = serde_json::to_string_pretty(metadata).map_err(std::io::Error::other)?;
        std::fs::write(&metadata_path, json)?;

        Ok(WrittenDocument {
            path,
            metadata_path,
        })
    }
}
