//! Candidate content-block extraction
//!
//! Turns one page snapshot into the text groups worth classifying.

mod block_extractor;
mod markup_extractor;

pub use block_extractor::*;
pub use markup_extractor::*;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::PassConfig;
use crate::error::{Error, Result};

/// Fragments collected under one grouping key from one page snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTextGroup")]
pub struct TextGroup {
    key: String,
    fragments: Vec<String>,
}

#[derive(Deserialize)]
struct RawTextGroup {
    key: String,
    fragments: Vec<String>,
}

impl TryFrom<RawTextGroup> for TextGroup {
    type Error = Error;

    fn try_from(raw: RawTextGroup) -> Result<Self> {
        TextGroup::new(raw.key, raw.fragments)
    }
}

impl TextGroup {
    pub fn new(key: impl Into<String>, fragments: Vec<String>) -> Result<Self> {
        let key = key.into();
        if fragments.is_empty() {
            return Err(Error::EmptyGroup(key));
        }
        Ok(Self { key, fragments })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn into_fragments(self) -> Vec<String> {
        self.fragments
    }

    /// Text sent to the classifier on behalf of the whole group.
    pub fn representative_text(&self) -> &str {
        self.fragments.first().map_or("", String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Extraction outcome for one grouping key, used for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub key: String,
    /// Fragments found before filtering
    pub raw: usize,
    /// Filtered fragment count when accepted
    pub accepted: Option<usize>,
    pub rejection: Option<Rejection>,
}

/// Grouping keys for this pass: explicit keys when configured, otherwise
/// every distinct attribute value on the page.
pub fn grouping_keys(query: &MarkupQuery, config: &PassConfig) -> Vec<String> {
    match &config.keys {
        Some(keys) => keys.clone(),
        None => query.find_groups_by_attribute(config.tag, &config.attribute),
    }
}

/// All groups on the snapshot that pass the block heuristics, in key order.
///
/// A key that matches no element at all is a configuration error.
pub fn extract_groups(query: &MarkupQuery, config: &PassConfig) -> Result<Vec<TextGroup>> {
    let extractor = config.block_extractor();
    let mut groups = Vec::new();

    for key in grouping_keys(query, config) {
        let raw = query.fragments_for_attribute_value(config.tag, &config.attribute, &key);
        if raw.is_empty() {
            return Err(Error::EmptyGroup(key));
        }

        match extractor.assess(&raw) {
            Verdict::Accepted(fragments) => {
                debug!(key = %key, fragments = fragments.len(), "accepted group");
                groups.push(TextGroup::new(key, fragments)?);
            }
            Verdict::Rejected(rejection) => {
                trace!(key = %key, ?rejection, "rejected group");
            }
        }
    }

    Ok(groups)
}

/// Per-key extraction outcome without classifying anything.
pub fn survey_groups(query: &MarkupQuery, config: &PassConfig) -> Vec<GroupReport> {
    let extractor = config.block_extractor();

    grouping_keys(query, config)
        .into_iter()
        .map(|key| {
            let raw = query.fragments_for_attribute_value(config.tag, &config.attribute, &key);
            let (accepted, rejection) = match extractor.assess(&raw) {
                Verdict::Accepted(fragments) => (Some(fragments.len()), None),
                Verdict::Rejected(rejection) => (None, Some(rejection)),
            };
            GroupReport {
                key,
                raw: raw.len(),
                accepted,
                rejection,
            }
        })
        .collect()
}
