//! Query tokenization and token histograms.

use crate::config::Tokenization;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Split a query into tokens.
///
/// `Words` splits on every single space and keeps the empty strings that
/// leading, trailing or repeated spaces produce. No trimming, no case
/// folding, no punctuation handling.
pub fn tokenize(text: &str, mode: Tokenization) -> Vec<&str> {
    match mode {
        Tokenization::Full => vec![text],
        Tokenization::Words => text.split(' ').collect(),
    }
}

/// Token occurrence counts for one window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Histogram {
    counts: BTreeMap<String, u64>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every token of `text`. Returns the number of tokens added.
    pub fn add_text(&mut self, text: &str, mode: Tokenization) -> u64 {
        let tokens = tokenize(text, mode);
        let added = tokens.len() as u64;
        for token in tokens {
            self.add_token(token);
        }
        added
    }

    pub fn add_token(&mut self, token: &str) {
        match self.counts.get_mut(token) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(token.to_string(), 1);
            }
        }
    }

    /// Count of a single token (zero if absent).
    pub fn get(&self, token: &str) -> u64 {
        self.counts.get(token).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Add all counts of `other` into this histogram.
    pub fn merge(&mut self, other: &Histogram) {
        for (token, count) in &other.counts {
            *self.counts.entry(token.clone()).or_insert(0) += count;
        }
    }
}

impl<'a> FromIterator<&'a str> for Histogram {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut histogram = Histogram::new();
        for token in iter {
            histogram.add_token(token);
        }
        histogram
    }
}
