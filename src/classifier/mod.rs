//! Classifier client: provider abstraction over the external text classifier.
//!
//! Wire contract (consumed verbatim):
//! request  `{ "message_text": "..." }`
//! response `{ "prediction": 0 | 1, "confidence": 0.0..1.0 }`

pub mod screen;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

pub use screen::{MessageScreener, ScreenParams, ScreenRequest, ScreeningOutcome};

/// Classifier answer. `prediction == 1` means the text looks like a minor wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub prediction: u8,
    pub confidence: f64,
}

impl Classification {
    pub fn is_positive(&self) -> bool {
        self.prediction == 1
    }
}

#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynClassifier = Arc<dyn Classifier>;

/// HTTP client for the classifier's `/predict` endpoint.
pub struct HttpClassifier {
    http: reqwest::Client,
    url: String,
}

impl HttpClassifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ClassifierError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("sentinel-verify/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4).min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[derive(Serialize)]
struct PredictReq<'a> {
    message_text: &'a str,
}

#[async_trait::async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&PredictReq { message_text: text })
            .send()
            .await
            .map_err(map_reqwest_err)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClassifierError::Status(status.as_u16()));
        }
        let body: Classification = resp
            .json()
            .await
            .map_err(|e| ClassifierError::Decode(e.to_string()))?;
        validate(body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn map_reqwest_err(e: reqwest::Error) -> ClassifierError {
    if e.is_timeout() {
        ClassifierError::Timeout
    } else if e.is_connect() {
        ClassifierError::Unavailable(e.to_string())
    } else {
        ClassifierError::Unavailable(format!("request failed: {e}"))
    }
}

fn validate(c: Classification) -> Result<Classification, ClassifierError> {
    if c.prediction > 1 {
        return Err(ClassifierError::Decode(format!(
            "prediction must be 0 or 1, got {}",
            c.prediction
        )));
    }
    if !(0.0..=1.0).contains(&c.confidence) {
        return Err(ClassifierError::Decode(format!(
            "confidence out of range: {}",
            c.confidence
        )));
    }
    Ok(c)
}

/// Used when no classifier URL is configured.
pub struct DisabledClassifier;

#[async_trait::async_trait]
impl Classifier for DisabledClassifier {
    async fn classify(&self, _text: &str) -> Result<Classification, ClassifierError> {
        Err(ClassifierError::Unavailable("classifier not configured".into()))
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic classifier for tests and local runs.
#[derive(Clone)]
pub struct MockClassifier {
    pub fixed: Classification,
}

#[async_trait::async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, _text: &str) -> Result<Classification, ClassifierError> {
        Ok(self.fixed)
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Build from an optional URL: `None` → disabled.
pub fn build_classifier(url: Option<&str>, timeout: Duration) -> Result<DynClassifier, ClassifierError> {
    match url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(u) => Ok(Arc::new(HttpClassifier::new(u, timeout)?)),
        None => Ok(Arc::new(DisabledClassifier)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_shape_is_two_fields() {
        let c: Classification =
            serde_json::from_str(r#"{"prediction": 1, "confidence": 0.92}"#).unwrap();
        assert!(c.is_positive());
        assert!((c.confidence - 0.92).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_values_are_decode_errors() {
        assert!(matches!(
            validate(Classification { prediction: 2, confidence: 0.5 }),
            Err(ClassifierError::Decode(_))
        ));
        assert!(matches!(
            validate(Classification { prediction: 0, confidence: 1.5 }),
            Err(ClassifierError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn missing_url_builds_disabled_client() {
        let c = build_classifier(Some("  "), Duration::from_secs(1)).unwrap();
        assert_eq!(c.name(), "disabled");
        let err = c.classify("hello").await.unwrap_err();
        assert!(err.is_expected_downtime());
    }
}
