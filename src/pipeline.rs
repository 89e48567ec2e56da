//! Archive-to-document processing.
//!
//! Runs the whole chain for one archive: extract, sort, aggregate, wrap in a
//! [`SearchDataDocument`].

use crate::core::{AggregateError, Aggregator, SearchDataDocument};
use crate::extractor::{ArchiveExtractor, ExtractError, ExtractorConfig};
use crate::transparency::TransparencyLog;
use std::io::{Read, Seek};
use thiserror::Error;

/// Errors from a full processing run.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Outcome of processing one archive.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub document: SearchDataDocument,
    pub entries_read: usize,
    pub events_extracted: usize,
}

/// Processes archives with fixed settings.
#[derive(Debug, Clone)]
pub struct Pipeline {
    extractor: ArchiveExtractor,
    aggregator: Aggregator,
}

impl Pipeline {
    pub fn new(extractor_config: ExtractorConfig, aggregator: Aggregator) -> Self {
        Self {
            extractor: ArchiveExtractor::new(extractor_config),
            aggregator,
        }
    }

    /// Process one archive. Counts go to `log` only when the run succeeds.
    pub fn process<R: Read + Seek>(
        &self,
        reader: R,
        log: Option<&mut TransparencyLog>,
    ) -> Result<ProcessOutput, ProcessError> {
        let extraction = self.extractor.extract(reader)?;
        let mut events = extraction.events;
        events.sort_by_timestamp();
        tracing::info!(
            entries = extraction.entries_read,
            events = events.len(),
            "extracted search events"
        );

        let series = self.aggregator.run(events.as_slice())?;
        tracing::info!(
            windows = series.len(),
            tokens = series.total_tokens(),
            "built time series"
        );

        if let Some(log) = log {
            log.record_extraction(extraction.entries_read, events.len());
            log.record_series(&series);
        }

        Ok(ProcessOutput {
            document: SearchDataDocument::new(self.aggregator.config(), series),
            entries_read: extraction.entries_read,
            events_extracted: events.len(),
        })
    }
}
