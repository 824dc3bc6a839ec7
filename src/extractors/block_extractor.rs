//! Content-block heuristics
//!
//! Decides whether the fragments collected under one grouping key look like a
//! real content block (a product list, a column of prices) or like navigation
//! and boilerplate noise.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::{DEFAULT_MAX_WORDS, DEFAULT_MIN_FRAGMENTS};

/// Filter applied to every candidate group before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockExtractor {
    /// Fragments with more whitespace-separated words are dropped
    pub max_words: usize,
    /// Groups with fewer surviving fragments are rejected
    pub min_fragments: usize,
}

impl Default for BlockExtractor {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
            min_fragments: DEFAULT_MIN_FRAGMENTS,
        }
    }
}

/// Why a group was not treated as content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    TooFewFragments { survivors: usize },
    Repetitive {
        fragment: String,
        count: usize,
        total: usize,
    },
}

/// Outcome of [`BlockExtractor::assess`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(Vec<String>),
    Rejected(Rejection),
}

impl Verdict {
    pub fn accepted(self) -> Option<Vec<String>> {
        match self {
            Verdict::Accepted(fragments) => Some(fragments),
            Verdict::Rejected(_) => None,
        }
    }
}

impl BlockExtractor {
    /// Filtered fragments if the group is a content block, `None` otherwise.
    pub fn evaluate<S: AsRef<str>>(&self, fragments: &[S]) -> Option<Vec<String>> {
        self.assess(fragments).accepted()
    }

    /// Like [`evaluate`](Self::evaluate) but keeps the rejection reason.
    pub fn assess<S: AsRef<str>>(&self, fragments: &[S]) -> Verdict {
        let survivors: Vec<String> = fragments
            .iter()
            .map(AsRef::<str>::as_ref)
            .filter(|text| {
                let words = text.split_whitespace().count();
                words > 0 && words <= self.max_words
            })
            .map(str::to_string)
            .collect();

        // An accepted group always has a representative fragment.
        if survivors.len() < self.min_fragments.max(1) {
            return Verdict::Rejected(Rejection::TooFewFragments {
                survivors: survivors.len(),
            });
        }

        if let Some((fragment, count)) = dominant_fragment(&survivors) {
            return Verdict::Rejected(Rejection::Repetitive {
                fragment: fragment.to_string(),
                count,
                total: survivors.len(),
            });
        }

        Verdict::Accepted(survivors)
    }
}

/// First fragment whose count reaches half of all fragments, rounded down.
fn dominant_fragment(fragments: &[String]) -> Option<(&str, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for fragment in fragments {
        *counts.entry(fragment.as_str()).or_default() += 1;
    }

    let total = fragments.len();
    fragments.iter().find_map(|fragment| {
        let count = counts[fragment.as_str()];
        (count >= total / 2).then_some((fragment.as_str(), count))
    })
}
