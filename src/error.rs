//! Error types for a classification pass.

use thiserror::Error;

/// Every way a pass can fail. Extraction rejections and below-threshold
/// scores are normal outcomes and never show up here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported tag name: {0}")]
    UnsupportedTag(String),

    #[error("label set is empty")]
    EmptyLabelSet,

    #[error("label names must not be blank")]
    BlankLabel,

    #[error("grouping key {0:?} has no fragments")]
    EmptyGroup(String),

    #[error("acceptance threshold {0} is outside [0, 1]")]
    InvalidThreshold(f64),

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("classifier failed: {0}")]
    Classifier(String),

    #[error("classifier contract violated for {text:?}: {msg}")]
    ClassifierContract { text: String, msg: String },

    #[error("navigation to {url} failed: {msg}")]
    Navigation { url: String, msg: String },

    #[error("no page has been loaded")]
    NoPage,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings error: {0}")]
    Settings(#[from] config::ConfigError),
}

impl Error {
    /// True for errors raised by the classification capability, as opposed to
    /// configuration or I/O problems. Callers use this to decide whether a
    /// pass is worth retrying.
    pub fn is_classifier_failure(&self) -> bool {
        matches!(
            self,
            Error::Classifier(_) | Error::ClassifierContract { .. }
        )
    }
}

/// Convenience Result type alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
