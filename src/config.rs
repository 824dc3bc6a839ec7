//! Pass configuration: the tag allow-list, the label set and the knobs of
//! one classification pass.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extractors::BlockExtractor;

/// Minimum winning score for a group to be kept.
pub const DEFAULT_THRESHOLD: f64 = 0.20;
/// Fragments longer than this many words are dropped from a group.
pub const DEFAULT_MAX_WORDS: usize = 25;
/// Groups with fewer surviving fragments are not content blocks.
pub const DEFAULT_MIN_FRAGMENTS: usize = 8;

/// Structural or text-bearing tags a pass may group on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum TagName {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    P,
    Table,
    Link,
    Div,
    G,
    Title,
    Ul,
    Form,
    Button,
    B,
    Span,
    A,
    Head,
    Body,
}

impl TagName {
    pub const ALL: [TagName; 20] = [
        TagName::H1,
        TagName::H2,
        TagName::H3,
        TagName::H4,
        TagName::H5,
        TagName::H6,
        TagName::P,
        TagName::Table,
        TagName::Link,
        TagName::Div,
        TagName::G,
        TagName::Title,
        TagName::Ul,
        TagName::Form,
        TagName::Button,
        TagName::B,
        TagName::Span,
        TagName::A,
        TagName::Head,
        TagName::Body,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TagName::H1 => "h1",
            TagName::H2 => "h2",
            TagName::H3 => "h3",
            TagName::H4 => "h4",
            TagName::H5 => "h5",
            TagName::H6 => "h6",
            TagName::P => "p",
            TagName::Table => "table",
            TagName::Link => "link",
            TagName::Div => "div",
            TagName::G => "g",
            TagName::Title => "title",
            TagName::Ul => "ul",
            TagName::Form => "form",
            TagName::Button => "button",
            TagName::B => "b",
            TagName::Span => "span",
            TagName::A => "a",
            TagName::Head => "head",
            TagName::Body => "body",
        }
    }
}

impl FromStr for TagName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        TagName::ALL
            .into_iter()
            .find(|tag| tag.as_str() == lower)
            .ok_or_else(|| Error::UnsupportedTag(s.to_string()))
    }
}

impl TryFrom<String> for TagName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TagName> for &'static str {
    fn from(tag: TagName) -> Self {
        tag.as_str()
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-empty, duplicate-free, order-preserving set of candidate labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for label in labels {
            let label: String = label.into();
            let label = label.trim();
            if label.is_empty() {
                return Err(Error::BlankLabel);
            }
            if !out.iter().any(|l| l == label) {
                out.push(label.to_string());
            }
        }
        if out.is_empty() {
            return Err(Error::EmptyLabelSet);
        }
        Ok(Self(out))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything one pass needs, formerly gathered through console prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassConfig {
    /// Tag whose elements are grouped
    pub tag: TagName,
    /// Attribute whose values form the grouping keys
    pub attribute: String,
    /// Candidate labels for the classifier
    pub labels: Vec<String>,
    /// Minimum winning score for a group to be kept
    pub threshold: f64,
    pub max_words: usize,
    pub min_fragments: usize,
    /// Explicit grouping keys; when absent every value found on the page is used
    pub keys: Option<Vec<String>>,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            tag: TagName::Div,
            attribute: "class".to_string(),
            labels: Vec::new(),
            threshold: DEFAULT_THRESHOLD,
            max_words: DEFAULT_MAX_WORDS,
            min_fragments: DEFAULT_MIN_FRAGMENTS,
            keys: None,
        }
    }
}

impl PassConfig {
    /// Check the configuration and return the validated label set.
    pub fn validate(&self) -> Result<LabelSet> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::InvalidThreshold(self.threshold));
        }
        LabelSet::new(self.labels.iter().map(String::as_str))
    }

    pub fn block_extractor(&self) -> BlockExtractor {
        BlockExtractor {
            max_words: self.max_words,
            min_fragments: self.min_fragments,
        }
    }
}
