//! Core functionality for seeq.
//!
//! This module contains:
//! - Query tokenization and token histograms
//! - Calendar windows for bucketing events
//! - Windowed aggregation into a time series
//! - The output document

pub mod aggregate;
pub mod document;
pub mod tokenize;
pub mod windowing;

// Re-export commonly used types
pub use aggregate::{
    aggregate, AggregateError, Aggregator, TimeSeries, TimeSeriesEntry, WindowCursor,
};
pub use document::{DocumentMetadata, SearchDataDocument, WrittenDocument, DOCUMENT_FILENAME};
pub use tokenize::{tokenize, Histogram};
pub use windowing::{isoformat, Window, WindowUnit};
