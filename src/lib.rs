// src/lib.rs
// Public library surface for the service binary, the CLI and integration tests.

pub mod api;
pub mod classifier;
pub mod config;
pub mod decision;
pub mod dispatch;
pub mod error;
pub mod evaluate;
pub mod metrics;
pub mod notify;
pub mod recorder;
pub mod rules;
pub mod scoring;
pub mod service;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::{app_from_config, router, AppState};
pub use crate::decision::{Decision, RuleOutcome, Verdict, DENY_THRESHOLD};
pub use crate::evaluate::{EvaluationContext, Evaluator, EvaluatorRegistry};
pub use crate::rules::{Rule, RuleSet, RuleStore, RuleType};
pub use crate::scoring::{FaultPolicy, ScoringEngine};
pub use crate::service::{ProfileHints, VerificationReport, VerificationService, VerifyRequest};
