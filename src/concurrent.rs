//! Concurrent classification
//!
//! Classification calls run concurrently, but their results are applied to
//! the buckets strictly in group order, so tie-breaks and occupancy counters
//! come out exactly as in the sequential pass.

use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use tracing::{info, warn};

use crate::aggregator::LabelAggregator;
use crate::classifier::{parse_zero_shot_response, ScoredLabel, ZeroShotEndpoint, ZeroShotRequest};
use crate::config::LabelSet;
use crate::error::{Error, Result};
use crate::extractors::TextGroup;
use crate::table::ResultTable;

/// Async counterpart of [`Classifier`](crate::classifier::Classifier).
#[allow(async_fn_in_trait)]
pub trait AsyncClassifier {
    async fn classify(&self, text: &str, labels: &LabelSet) -> Result<Vec<ScoredLabel>>;
}

/// Non-blocking client for a zero-shot inference endpoint.
pub struct AsyncHttpClassifier {
    client: reqwest::Client,
    endpoint: ZeroShotEndpoint,
}

impl AsyncHttpClassifier {
    pub fn new(endpoint: ZeroShotEndpoint) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(endpoint.timeout_secs))
            .build()
            .map_err(|e| Error::Classifier(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, endpoint })
    }
}

impl AsyncClassifier for AsyncHttpClassifier {
    async fn classify(&self, text: &str, labels: &LabelSet) -> Result<Vec<ScoredLabel>> {
        let body = serde_json::to_string(&ZeroShotRequest::new(text, labels))?;
        let url = &self.endpoint.url;

        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(ref token) = self.endpoint.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Classifier(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "zero-shot endpoint refused request");
            return Err(Error::Classifier(format!("HTTP {} from {}", status, url)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::Classifier(format!("failed to read {}: {}", url, e)))?;

        parse_zero_shot_response(&text)
    }
}

impl LabelAggregator {
    /// Like [`run`](Self::run), with up to `concurrency` classification calls
    /// in flight. The first failure aborts the pass.
    pub async fn run_concurrent<C>(
        &mut self,
        groups: Vec<TextGroup>,
        classifier: &C,
        concurrency: usize,
    ) -> Result<ResultTable>
    where
        C: AsyncClassifier,
    {
        if concurrency == 0 {
            return Err(Error::ZeroConcurrency);
        }

        let labels = self.labels().clone();
        let scores: Vec<Vec<ScoredLabel>> = stream::iter(groups.iter())
            .map(|group| classifier.classify(group.representative_text(), &labels))
            .buffered(concurrency)
            .try_collect()
            .await?;

        let total = groups.len();
        for (group, scores) in groups.into_iter().zip(scores) {
            if let Err(e) = self.apply(group, &scores) {
                self.discard();
                return Err(e);
            }
        }

        info!(
            groups = total,
            buckets = self.buckets().len(),
            concurrency,
            "concurrent aggregation pass complete"
        );
        Ok(self.table())
    }
}
