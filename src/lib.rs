//! Zero-shot classification of page content blocks
//!
//! Groups the text of a rendered page by a structural attribute, keeps the
//! groups that look like real content, classifies each group into a
//! caller-supplied label and assembles the result into one table:
//! - Block heuristics (fragment length, group size, repetition)
//! - Label aggregation with collision renaming
//! - Padded table assembly and CSV export
//! - Blocking, concurrent and FFI entry points

pub mod aggregator;
pub mod classifier;
pub mod concurrent;
pub mod config;
pub mod driver;
pub mod error;
pub mod extractors;
pub mod ffi;
pub mod pipeline;
pub mod settings;
pub mod table;

#[cfg(test)]
mod test_support;

pub use aggregator::{LabelAggregator, LabelBucket, Placement};
pub use classifier::{Classifier, HttpClassifier, ScoredLabel, ZeroShotEndpoint};
pub use concurrent::{AsyncClassifier, AsyncHttpClassifier};
pub use config::{LabelSet, PassConfig, TagName};
pub use driver::{HttpDriver, PageDriver, StaticPage};
pub use error::{Error, Result};
pub use extractors::{BlockExtractor, MarkupQuery, TextGroup};
pub use pipeline::{run_pass, run_pass_concurrent, PassOutput};
pub use settings::Settings;
pub use table::ResultTable;
