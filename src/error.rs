//! Error kinds surfaced at the engine's boundaries.
//!
//! Each collaborator gets its own enum so callers can tell an expected outage
//! (rule source down, classifier offline) from a real failure.

use thiserror::Error;

/// Failure to install a new rule set. The previous snapshot keeps serving.
#[derive(Debug, Error)]
pub enum RuleStoreError {
    #[error("rule source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("rule set rejected: {0}")]
    InvalidRuleSet(String),
}

/// One rule's evaluator could not produce an outcome.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("evaluator fault in rule '{rule}': {reason}")]
pub struct EvaluatorFault {
    pub rule: String,
    pub reason: String,
}

impl EvaluatorFault {
    pub fn new(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            reason: reason.into(),
        }
    }
}

/// User/attempt persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user '{0}' not found")]
    NotFound(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("persistence timed out")]
    Timeout,
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::TimedOut {
            StoreError::Timeout
        } else {
            StoreError::Persistence(e.to_string())
        }
    }
}

/// External classifier errors. `Unavailable` is the expected-downtime case.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("classifier request timed out")]
    Timeout,

    #[error("classifier responded with HTTP {0}")]
    Status(u16),

    #[error("classifier response could not be decoded: {0}")]
    Decode(String),

    /// Rejected before any request was made.
    #[error("invalid classifier input: {0}")]
    InvalidInput(String),
}

impl ClassifierError {
    /// True for outages that should not produce noisy logs.
    pub fn is_expected_downtime(&self) -> bool {
        matches!(self, ClassifierError::Unavailable(_))
    }
}
