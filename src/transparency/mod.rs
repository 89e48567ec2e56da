//! Transparency module for seeq.
//!
//! Tracks what was read from an archive and what was produced from it, so a
//! user can see exactly how their search history was used.

pub mod log;

pub use log::{TransparencyError, TransparencyLog, TransparencyStats};
