// src/evaluate/mod.rs
//! Rule evaluators: one strategy per rule type, looked up by type id.
//!
//! Evaluators are pure functions of `(rule, context)`. They decode their own
//! `rule_data` payload and report a malformed payload as an `EvaluatorFault`;
//! the scoring engine decides what a fault means.

pub mod date;
pub mod keyword;
pub mod length;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::decision::RuleOutcome;
use crate::error::EvaluatorFault;
use crate::rules::Rule;

pub use date::DateCheck;
pub use keyword::KeywordBlacklist;
pub use length::LengthCheck;

/// Per-evaluation input. Built fresh for every attempt and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    pub subject_text: String,
    pub is_privileged_tier: bool,
    pub submitted_at: DateTime<Utc>,
}

impl EvaluationContext {
    pub fn new(subject_text: impl Into<String>, is_privileged_tier: bool) -> Self {
        Self {
            subject_text: subject_text.into(),
            is_privileged_tier,
            submitted_at: Utc::now(),
        }
    }

    pub fn at(mut self, submitted_at: DateTime<Utc>) -> Self {
        self.submitted_at = submitted_at;
        self
    }
}

/// Strategy for one rule type.
pub trait Evaluator: Send + Sync {
    /// Type id this evaluator handles (matches `Rule::rule_type`).
    fn rule_type(&self) -> &'static str;

    fn evaluate(&self, rule: &Rule, ctx: &EvaluationContext) -> Result<RuleOutcome, EvaluatorFault>;
}

/// Evaluators keyed by rule type id. Types without an evaluator are inert.
#[derive(Clone, Default)]
pub struct EvaluatorRegistry {
    by_type: HashMap<String, Arc<dyn Evaluator>>,
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `keyword_blacklist`, `length_check` and `date_check`.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register(Arc::new(KeywordBlacklist));
        reg.register(Arc::new(LengthCheck));
        reg.register(Arc::new(DateCheck));
        reg
    }

    /// Add or replace the evaluator for its type id.
    pub fn register(&mut self, evaluator: Arc<dyn Evaluator>) -> &mut Self {
        self.by_type
            .insert(evaluator.rule_type().to_string(), evaluator);
        self
    }

    pub fn get(&self, rule_type: &str) -> Option<&Arc<dyn Evaluator>> {
        self.by_type.get(rule_type)
    }

    pub fn types(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.by_type.keys().map(String::as_str).collect();
        v.sort_unstable();
        v
    }

    /// Dispatch by type; unknown types pass with zero contribution.
    pub fn evaluate(&self, rule: &Rule, ctx: &EvaluationContext) -> Result<RuleOutcome, EvaluatorFault> {
        match self.get(rule.rule_type.as_str()) {
            Some(ev) => ev.evaluate(rule, ctx),
            None => Ok(RuleOutcome::pass(&rule.name)),
        }
    }
}

impl std::fmt::Debug for EvaluatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorRegistry")
            .field("types", &self.types())
            .finish()
    }
}

/// Decode `rule.rule_data` into an evaluator's payload type.
pub(crate) fn decode_data<T: DeserializeOwned>(rule: &Rule) -> Result<T, EvaluatorFault> {
    serde_json::from_value(rule.rule_data.clone())
        .map_err(|e| EvaluatorFault::new(&rule.name, format!("malformed rule_data: {e}")))
}

/// Outcome for a rule whose check failed: contributes the rule's full score.
pub(crate) fn failed(rule: &Rule) -> RuleOutcome {
    RuleOutcome::fail(&rule.name, rule.score)
}

/// Lowercase + collapse whitespace runs, so matching ignores case and spacing.
pub(crate) fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.extend(ch.to_lowercase());
            last_space = false;
        }
    }
    out.trim().to_string()
}
