//! # Scoring Engine
//! Pure, testable aggregation: ordered rules + context → `Verdict`.
//! No I/O and no shared mutable state, so any number of evaluations may run
//! concurrently against the same snapshot.
//!
//! Policy: disabled rules are skipped entirely; the suspicion score is the sum
//! of contributions of failed rules; thresholds live in `Decision::from_score`.

use std::panic::{catch_unwind, AssertUnwindSafe};

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::decision::{RuleOutcome, Verdict};
use crate::error::EvaluatorFault;
use crate::evaluate::{EvaluationContext, EvaluatorRegistry};
use crate::rules::Rule;

/// What a faulting evaluator means for its rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Treat the rule as passed (zero contribution).
    #[default]
    FailOpen,
    /// Treat the rule as failed with its full score.
    FailClosed,
}

#[derive(Debug, Clone)]
pub struct ScoringEngine {
    registry: EvaluatorRegistry,
    fault_policy: FaultPolicy,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(EvaluatorRegistry::with_builtins(), FaultPolicy::default())
    }
}

impl ScoringEngine {
    pub fn new(registry: EvaluatorRegistry, fault_policy: FaultPolicy) -> Self {
        Self {
            registry,
            fault_policy,
        }
    }

    pub fn fault_policy(&self) -> FaultPolicy {
        self.fault_policy
    }

    pub fn registry(&self) -> &EvaluatorRegistry {
        &self.registry
    }

    /// Evaluate every enabled rule in order and aggregate into a verdict.
    pub fn evaluate(&self, rules: &[Rule], ctx: &EvaluationContext) -> Verdict {
        let outcomes = rules
            .iter()
            .filter(|r| r.enabled)
            .map(|r| self.evaluate_rule(r, ctx))
            .collect();
        Verdict::from_outcomes(outcomes)
    }

    fn evaluate_rule(&self, rule: &Rule, ctx: &EvaluationContext) -> RuleOutcome {
        let result = catch_unwind(AssertUnwindSafe(|| self.registry.evaluate(rule, ctx)))
            .unwrap_or_else(|panic| {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "evaluator panicked".to_string());
                Err(EvaluatorFault::new(&rule.name, reason))
            });

        match result {
            // Outcomes from evaluators are normalized: the rule's score is the
            // only thing a failed rule may contribute.
            Ok(o) if o.passed => RuleOutcome::pass(&rule.name),
            Ok(_) => RuleOutcome::fail(&rule.name, rule.score),
            Err(fault) => {
                counter!("rule_evaluator_faults_total").increment(1);
                warn!(
                    target: "scoring",
                    rule = %rule.name,
                    rule_type = %rule.rule_type,
                    policy = ?self.fault_policy,
                    reason = %fault.reason,
                    "rule evaluator fault"
                );
                match self.fault_policy {
                    FaultPolicy::FailOpen => RuleOutcome::pass(&rule.name).mark_faulted(),
                    FaultPolicy::FailClosed => {
                        RuleOutcome::fail(&rule.name, rule.score).mark_faulted()
                    }
                }
            }
        }
    }
}
