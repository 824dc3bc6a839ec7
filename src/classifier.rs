//! Zero-shot classification capability
//!
//! The model itself is external. The core only needs "text × labels → scored
//! labels", expressed by [`Classifier`]; [`HttpClassifier`] speaks the
//! Hugging Face zero-shot inference shape over a blocking ureq agent.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::LabelSet;
use crate::error::{Error, Result};

/// One label with its confidence in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
    pub label: String,
    pub score: f64,
}

impl ScoredLabel {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Scores every label of `labels` for `text`.
pub trait Classifier {
    fn classify(&self, text: &str, labels: &LabelSet) -> Result<Vec<ScoredLabel>>;
}

impl<C: Classifier + ?Sized> Classifier for &C {
    fn classify(&self, text: &str, labels: &LabelSet) -> Result<Vec<ScoredLabel>> {
        (**self).classify(text, labels)
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn classify(&self, text: &str, labels: &LabelSet) -> Result<Vec<ScoredLabel>> {
        (**self).classify(text, labels)
    }
}

/// Pick the winning label: strictly highest score, earliest entry on ties.
///
/// Fails when the classifier broke its contract: every requested label must
/// be scored exactly once, with a score in `[0, 1]`.
pub fn select_label<'a>(
    text: &str,
    scores: &'a [ScoredLabel],
    labels: &LabelSet,
) -> Result<&'a ScoredLabel> {
    let contract = |msg: String| Error::ClassifierContract {
        text: text.to_string(),
        msg,
    };

    if scores.is_empty() {
        return Err(contract("no scores returned".to_string()));
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(scores.len());
    let mut best: Option<&ScoredLabel> = None;
    for scored in scores {
        if !(0.0..=1.0).contains(&scored.score) {
            return Err(contract(format!(
                "score {} for {:?} is outside [0, 1]",
                scored.score, scored.label
            )));
        }
        if !labels.contains(&scored.label) {
            return Err(contract(format!("unexpected label {:?}", scored.label)));
        }
        if !seen.insert(scored.label.as_str()) {
            return Err(contract(format!("label {:?} scored twice", scored.label)));
        }
        match best {
            Some(current) if scored.score <= current.score => {}
            _ => best = Some(scored),
        }
    }

    if let Some(missing) = labels.iter().find(|label| !seen.contains(label)) {
        return Err(contract(format!("label {:?} was not scored", missing)));
    }

    best.ok_or_else(|| contract("no scores returned".to_string()))
}

/// Where and how to reach a zero-shot inference endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZeroShotEndpoint {
    pub url: String,
    /// Sent as a bearer token when present
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ZeroShotEndpoint {
    fn default() -> Self {
        Self {
            url: "https://api-inference.huggingface.co/models/facebook/bart-large-mnli".to_string(),
            token: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [String],
}

impl<'a> ZeroShotRequest<'a> {
    pub(crate) fn new(text: &'a str, labels: &'a LabelSet) -> Self {
        Self {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels: labels.as_slice(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ZeroShotResponse {
    labels: Vec<String>,
    scores: Vec<f64>,
}

/// Some deployments wrap a single answer in a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotReply {
    Single(ZeroShotResponse),
    Batch(Vec<ZeroShotResponse>),
}

/// Decode an inference endpoint body into scored labels.
pub(crate) fn parse_zero_shot_response(body: &str) -> Result<Vec<ScoredLabel>> {
    let reply: ZeroShotReply = serde_json::from_str(body)
        .map_err(|e| Error::Classifier(format!("invalid zero-shot response: {}", e)))?;

    let response = match reply {
        ZeroShotReply::Single(r) => r,
        ZeroShotReply::Batch(mut batch) => {
            if batch.len() != 1 {
                return Err(Error::Classifier(format!(
                    "expected one zero-shot result, got {}",
                    batch.len()
                )));
            }
            batch.remove(0)
        }
    };

    if response.labels.len() != response.scores.len() {
        return Err(Error::Classifier(format!(
            "{} labels but {} scores",
            response.labels.len(),
            response.scores.len()
        )));
    }

    Ok(response
        .labels
        .into_iter()
        .zip(response.scores)
        .map(|(label, score)| ScoredLabel { label, score })
        .collect())
}

/// Blocking client for a zero-shot inference endpoint.
pub struct HttpClassifier {
    agent: ureq::Agent,
    endpoint: ZeroShotEndpoint,
}

impl HttpClassifier {
    pub fn new(endpoint: ZeroShotEndpoint) -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .timeout_global(Some(Duration::from_secs(endpoint.timeout_secs)))
                .http_status_as_error(false)
                .build(),
        );
        Self { agent, endpoint }
    }
}

impl Classifier for HttpClassifier {
    fn classify(&self, text: &str, labels: &LabelSet) -> Result<Vec<ScoredLabel>> {
        let body = serde_json::to_string(&ZeroShotRequest::new(text, labels))?;
        let url = &self.endpoint.url;

        let mut request = self
            .agent
            .post(url)
            .header("Content-Type", "application/json");
        if let Some(ref token) = self.endpoint.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send(body.as_str())
            .map_err(|e| Error::Classifier(format!("request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            warn!(url = %url, status = %response.status(), "zero-shot endpoint refused request");
            return Err(Error::Classifier(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let text = response
            .into_body()
            .read_to_string()
            .map_err(|e| Error::Classifier(format!("failed to read {}: {}", url, e)))?;

        parse_zero_shot_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    fn labels() -> LabelSet {
        LabelSet::new(["Price", "Review"]).unwrap()
    }

    #[test]
    fn test_select_highest() {
        let scores = vec![ScoredLabel::new("Review", 0.3), ScoredLabel::new("Price", 0.7)];
        let best = select_label("$10", &scores, &labels()).unwrap();
        assert_eq!(best, &ScoredLabel::new("Price", 0.7));
    }

    #[test]
    fn test_ties_go_to_first_returned() {
        let scores = vec![ScoredLabel::new("Review", 0.5), ScoredLabel::new("Price", 0.5)];
        let best = select_label("$10", &scores, &labels()).unwrap();
        assert_eq!(best.label, "Review");
    }

    #[test]
    fn test_contract_violations() {
        let empty: Vec<ScoredLabel> = vec![];
        assert!(matches!(
            select_label("x", &empty, &labels()),
            Err(Error::ClassifierContract { .. })
        ));

        let out_of_range = vec![ScoredLabel::new("Price", 1.2)];
        assert!(select_label("x", &out_of_range, &labels()).is_err());

        let nan = vec![ScoredLabel::new("Price", f64::NAN)];
        assert!(select_label("x", &nan, &labels()).is_err());

        let unknown = vec![ScoredLabel::new("Shipping", 0.9), ScoredLabel::new("Price", 0.1)];
        let err = select_label("x", &unknown, &labels()).unwrap_err();
        assert!(err.is_classifier_failure());
    }

    #[test]
    fn test_every_label_scored_exactly_once() {
        let missing = vec![ScoredLabel::new("Price", 0.9)];
        let err = select_label("x", &missing, &labels()).unwrap_err();
        assert!(matches!(
            err,
            Error::ClassifierContract { ref msg, .. } if msg.contains("\"Review\" was not scored")
        ));

        let duplicate = vec![
            ScoredLabel::new("Price", 0.6),
            ScoredLabel::new("Review", 0.1),
            ScoredLabel::new("Price", 0.3),
        ];
        let err = select_label("x", &duplicate, &labels()).unwrap_err();
        assert!(matches!(
            err,
            Error::ClassifierContract { ref msg, .. } if msg.contains("scored twice")
        ));
    }

    #[test]
    fn test_request_shape() {
        let labels = labels();
        let json = serde_json::to_value(ZeroShotRequest::new("$999", &labels)).unwrap();
        assert_eq!(json["inputs"], "$999");
        assert_eq!(json["parameters"]["candidate_labels"][1], "Review");
    }

    #[test]
    fn test_parse_response_shapes() {
        let single = r#"{"sequence": "$999", "labels": ["Price", "Review"], "scores": [0.9, 0.1]}"#;
        let scores = parse_zero_shot_response(single).unwrap();
        assert_eq!(scores[0], ScoredLabel::new("Price", 0.9));

        let batch = r#"[{"labels": ["Review", "Price"], "scores": [0.6, 0.4]}]"#;
        let scores = parse_zero_shot_response(batch).unwrap();
        assert_eq!(scores[0].label, "Review");

        let mismatched = r#"{"labels": ["Price"], "scores": [0.6, 0.4]}"#;
        assert!(parse_zero_shot_response(mismatched).is_err());
        assert!(parse_zero_shot_response("not json").is_err());
    }

    #[test]
    fn test_http_classifier_round_trip() {
        let (url, handle) =
            serve_once("200 OK", r#"{"labels": ["Price", "Review"], "scores": [0.8, 0.2]}"#);
        let classifier = HttpClassifier::new(ZeroShotEndpoint {
            url,
            token: Some("secret".to_string()),
            timeout_secs: 5,
        });

        let scores = classifier.classify("$999", &labels()).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0], ScoredLabel::new("Price", 0.8));

        let request = handle.join().unwrap();
        assert!(request.starts_with("POST "));
        assert!(request.to_lowercase().contains("authorization: bearer secret"));
        assert!(request.contains(r#""candidate_labels":["Price","Review"]"#));
    }

    #[test]
    fn test_http_classifier_error_status() {
        let (url, handle) = serve_once("503 Service Unavailable", r#"{"error": "loading"}"#);
        let classifier = HttpClassifier::new(ZeroShotEndpoint {
            url,
            token: None,
            timeout_secs: 5,
        });

        let err = classifier.classify("$999", &labels()).unwrap_err();
        assert!(matches!(err, Error::Classifier(_)));
        handle.join().unwrap();
    }
}
