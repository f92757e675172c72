//! decision.rs — verdict shape produced by the scoring engine.
//!
//! A `Verdict` is derived once from the ordered rule outcomes and never
//! mutated afterwards. The `Decision` thresholds live here so that exactly one
//! place owns the policy.

use serde::{Deserialize, Serialize};

/// Score at which a verdict becomes `denied` (inclusive).
pub const DENY_THRESHOLD: f64 = 100.0;

/// Tri-state decision for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Passed,
    Flagged,
    Denied,
}

impl Decision {
    /// `0 → passed`, `(0, 100) → flagged`, `>= 100 → denied`.
    pub fn from_score(suspicion_score: f64) -> Self {
        if suspicion_score <= 0.0 {
            Decision::Passed
        } else if suspicion_score < DENY_THRESHOLD {
            Decision::Flagged
        } else {
            Decision::Denied
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Passed => "passed",
            Decision::Flagged => "flagged",
            Decision::Denied => "denied",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one rule against one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule_name: String,
    pub passed: bool,
    pub contributed_score: f64,
    /// Set when the evaluator faulted and the fault policy decided `passed`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub faulted: bool,
}

impl RuleOutcome {
    pub fn pass(rule_name: impl Into<String>) -> Self {
        Self {
            rule_name: rule_name.into(),
            passed: true,
            contributed_score: 0.0,
            faulted: false,
        }
    }

    pub fn fail(rule_name: impl Into<String>, score: f64) -> Self {
        Self {
            rule_name: rule_name.into(),
            passed: false,
            contributed_score: score,
            faulted: false,
        }
    }

    pub(crate) fn mark_faulted(mut self) -> Self {
        self.faulted = true;
        self
    }
}

/// Aggregate result of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub suspicion_score: f64,
    pub passed_rules: Vec<String>,
    pub failed_rules: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faulted_rules: Vec<String>,
    pub decision: Decision,
    /// Per-rule outcomes in evaluation order (audit trail).
    #[serde(default)]
    pub outcomes: Vec<RuleOutcome>,
}

impl Verdict {
    /// Build the verdict from outcomes in rule iteration order.
    pub fn from_outcomes(outcomes: Vec<RuleOutcome>) -> Self {
        let mut suspicion_score = 0.0;
        let mut passed_rules = Vec::new();
        let mut failed_rules = Vec::new();
        let mut faulted_rules = Vec::new();

        for o in &outcomes {
            if o.faulted {
                faulted_rules.push(o.rule_name.clone());
            }
            if o.passed {
                passed_rules.push(o.rule_name.clone());
            } else {
                failed_rules.push(o.rule_name.clone());
                suspicion_score += o.contributed_score;
            }
        }

        Self {
            suspicion_score,
            passed_rules,
            failed_rules,
            faulted_rules,
            decision: Decision::from_score(suspicion_score),
            outcomes,
        }
    }

    /// Verdict for an empty rule set.
    pub fn empty() -> Self {
        Self::from_outcomes(Vec::new())
    }
}
