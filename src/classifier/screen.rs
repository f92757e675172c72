//! Real-time message screening through the classifier.
//!
//! Moderators and very short messages are skipped. A message is flagged only
//! when the classifier predicts `1` with at least `confidence_threshold`.

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Classification, DynClassifier};
use crate::error::ClassifierError;
use crate::telemetry::fingerprint;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.8;
pub const DEFAULT_MIN_LENGTH: usize = 10;
/// Bounds for on-demand moderator analysis, in characters after trimming.
pub const ANALYZE_MIN_CHARS: usize = 10;
pub const ANALYZE_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenParams {
    pub confidence_threshold: f64,
    pub min_length: usize,
}

impl Default for ScreenParams {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            min_length: DEFAULT_MIN_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenRequest {
    pub text: String,
    #[serde(default)]
    pub author_is_moderator: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScreeningOutcome {
    Skipped { reason: String },
    Clear { confidence: f64 },
    Flagged { confidence: f64 },
}

impl ScreeningOutcome {
    pub fn is_flagged(&self) -> bool {
        matches!(self, ScreeningOutcome::Flagged { .. })
    }
}

pub struct MessageScreener {
    classifier: DynClassifier,
    params: ScreenParams,
}

impl MessageScreener {
    pub fn new(classifier: DynClassifier, params: ScreenParams) -> Self {
        Self { classifier, params }
    }

    pub fn params(&self) -> ScreenParams {
        self.params
    }

    pub async fn screen(&self, req: &ScreenRequest) -> Result<ScreeningOutcome, ClassifierError> {
        if req.author_is_moderator {
            return Ok(ScreeningOutcome::Skipped {
                reason: "author is a moderator".into(),
            });
        }
        let trimmed = req.text.trim();
        if trimmed.chars().count() < self.params.min_length {
            return Ok(ScreeningOutcome::Skipped {
                reason: format!("shorter than {} characters", self.params.min_length),
            });
        }

        let text_id = fingerprint(&req.text);
        let c = match self.classifier.classify(&req.text).await {
            Ok(c) => c,
            Err(e) => {
                if e.is_expected_downtime() {
                    debug!(target: "screen", provider = self.classifier.name(), error = %e, "classifier offline");
                } else {
                    warn!(target: "screen", provider = self.classifier.name(), %text_id, error = %e, "classifier call failed");
                }
                return Err(e);
            }
        };

        if c.is_positive() && c.confidence >= self.params.confidence_threshold {
            counter!("screen_flagged_total").increment(1);
            info!(target: "screen", %text_id, confidence = c.confidence, "message flagged");
            Ok(ScreeningOutcome::Flagged {
                confidence: c.confidence,
            })
        } else {
            Ok(ScreeningOutcome::Clear {
                confidence: c.confidence,
            })
        }
    }

    /// Moderator-requested analysis: raw classifier answer, no threshold and
    /// no moderator bypass.
    pub async fn analyze(&self, text: &str) -> Result<Classification, ClassifierError> {
        let len = text.trim().chars().count();
        if !(ANALYZE_MIN_CHARS..=ANALYZE_MAX_CHARS).contains(&len) {
            return Err(ClassifierError::InvalidInput(format!(
                "text must be {ANALYZE_MIN_CHARS}..={ANALYZE_MAX_CHARS} characters, got {len}"
            )));
        }
        let c = self.classifier.classify(text).await?;
        info!(
            target: "screen",
            text_id = %fingerprint(text),
            prediction = c.prediction,
            confidence = c.confidence,
            "moderator analysis"
        );
        Ok(c)
    }
}
