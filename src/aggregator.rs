//! Label aggregation
//!
//! Classifies each accepted group, keeps it under its winning label and turns
//! the retained groups into one rectangular table.
//!
//! Collisions keep the first claimant of a label under the bare name. Each
//! later claimant gets a new bucket named `<label>-<n>`, where `n` is the
//! base bucket's occupancy at that moment, and the base occupancy then
//! advances by one. The base bucket's fragments are never replaced.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::classifier::{select_label, Classifier, ScoredLabel};
use crate::config::{LabelSet, PassConfig};
use crate::error::{Error, Result};
use crate::extractors::TextGroup;
use crate::table::ResultTable;

/// Retained content for one bucket name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelBucket {
    /// Key of the group stored here
    pub source_key: String,
    fragments: Vec<String>,
    occupancy: usize,
}

impl LabelBucket {
    fn new(group: TextGroup) -> Self {
        let source_key = group.key().to_string();
        Self {
            source_key,
            fragments: group.into_fragments(),
            occupancy: 1,
        }
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// How many distinct groups have claimed this bucket's label.
    pub fn occupancy(&self) -> usize {
        self.occupancy
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// What happened to one group.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// Stored under this bucket name
    Retained { bucket: String, score: f64 },
    /// Winning score was under the threshold
    BelowThreshold { label: String, score: f64 },
}

/// State of one aggregation pass.
#[derive(Debug, Clone)]
pub struct LabelAggregator {
    labels: LabelSet,
    threshold: f64,
    buckets: IndexMap<String, LabelBucket>,
}

impl LabelAggregator {
    pub fn new(labels: LabelSet, threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::InvalidThreshold(threshold));
        }
        Ok(Self {
            labels,
            threshold,
            buckets: IndexMap::new(),
        })
    }

    pub fn from_config(config: &PassConfig) -> Result<Self> {
        let labels = config.validate()?;
        Self::new(labels, config.threshold)
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify every group in order and assemble the table.
    ///
    /// A classifier failure aborts the pass and discards every bucket built
    /// so far; no table is produced.
    pub fn run<I, C>(&mut self, groups: I, classifier: &C) -> Result<ResultTable>
    where
        I: IntoIterator<Item = TextGroup>,
        C: Classifier + ?Sized,
    {
        let mut seen = 0usize;
        for group in groups {
            seen += 1;
            let scores = match classifier.classify(group.representative_text(), &self.labels) {
                Ok(scores) => scores,
                Err(e) => {
                    self.discard();
                    return Err(e);
                }
            };
            if let Err(e) = self.apply(group, &scores) {
                self.discard();
                return Err(e);
            }
        }

        info!(groups = seen, buckets = self.buckets.len(), "aggregation pass complete");
        Ok(self.table())
    }

    /// Select the label for an already-classified group and store it.
    pub fn apply(&mut self, group: TextGroup, scores: &[ScoredLabel]) -> Result<Placement> {
        let best = select_label(group.representative_text(), scores, &self.labels)?;

        if best.score < self.threshold {
            debug!(
                key = group.key(),
                label = %best.label,
                score = best.score,
                "dropped group below threshold"
            );
            return Ok(Placement::BelowThreshold {
                label: best.label.clone(),
                score: best.score,
            });
        }

        let score = best.score;
        let bucket = self.place(&best.label, group);
        Ok(Placement::Retained { bucket, score })
    }

    fn place(&mut self, label: &str, group: TextGroup) -> String {
        let Some(base) = self.buckets.get(label) else {
            debug!(key = group.key(), bucket = label, "new bucket");
            self.buckets.insert(label.to_string(), LabelBucket::new(group));
            return label.to_string();
        };

        let mut n = base.occupancy;
        let mut name = format!("{}-{}", label, n);
        // A caller label may itself look like a renamed bucket.
        while self.buckets.contains_key(&name) {
            n += 1;
            name = format!("{}-{}", label, n);
        }

        debug!(key = group.key(), label, bucket = %name, "label collision");
        self.buckets.insert(name.clone(), LabelBucket::new(group));
        if let Some(base) = self.buckets.get_mut(label) {
            base.occupancy += 1;
        }
        name
    }

    /// Drop everything retained so far.
    pub(crate) fn discard(&mut self) {
        self.buckets.clear();
    }

    pub fn buckets(&self) -> &IndexMap<String, LabelBucket> {
        &self.buckets
    }

    pub fn bucket(&self, name: &str) -> Option<&LabelBucket> {
        self.buckets.get(name)
    }

    pub fn into_buckets(self) -> IndexMap<String, LabelBucket> {
        self.buckets
    }

    /// Pad every bucket to the longest one and lay them out as columns in
    /// creation order.
    pub fn table(&self) -> ResultTable {
        ResultTable::from_columns(
            self.buckets
                .iter()
                .map(|(name, bucket)| (name.clone(), bucket.fragments.clone())),
        )
    }
}
