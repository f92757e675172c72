//! Verification pipeline for one attempt:
//! rule snapshot → scoring → recording → dispatch.
//!
//! The verdict and outcome are always returned. A failed write is reported in
//! `recording_error` so the host can still act on the verdict.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::decision::Verdict;
use crate::dispatch::{OutcomeDescriptor, VerdictDispatcher};
use crate::evaluate::EvaluationContext;
use crate::recorder::{AccountTier, AttemptRecord, DecisionRecorder, UserIdentity};
use crate::rules::RuleStore;
use crate::scoring::ScoringEngine;
use crate::telemetry::fingerprint;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    #[serde(flatten)]
    pub user: UserIdentity,
    pub text: String,
    #[serde(default)]
    pub is_privileged: bool,
    /// Profile facts from the chat platform. Any paid perk also selects the
    /// privileged tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileHints>,
    /// Defaults to the time the request is handled.
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl VerifyRequest {
    /// Explicit flag or any paid-tier perk on the profile.
    pub fn privileged_tier(&self) -> bool {
        self.is_privileged || self.profile.is_some_and(|p| p.has_paid_perks())
    }
}

/// Perks only a paid subscription unlocks on the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileHints {
    #[serde(default)]
    pub animated_avatar: bool,
    #[serde(default)]
    pub banner: bool,
    #[serde(default)]
    pub boosting: bool,
}

impl ProfileHints {
    pub fn has_paid_perks(&self) -> bool {
        self.animated_avatar || self.banner || self.boosting
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub verdict: Verdict,
    pub outcome: OutcomeDescriptor,
    pub rules_version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<AttemptRecord>,
    /// Present when the attempt could not be persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_error: Option<String>,
}

impl VerificationReport {
    pub fn recorded(&self) -> bool {
        self.recording_error.is_none()
    }
}

pub struct VerificationService {
    rules: Arc<RuleStore>,
    engine: ScoringEngine,
    recorder: DecisionRecorder,
    dispatcher: VerdictDispatcher,
}

impl VerificationService {
    pub fn new(
        rules: Arc<RuleStore>,
        engine: ScoringEngine,
        recorder: DecisionRecorder,
        dispatcher: VerdictDispatcher,
    ) -> Self {
        Self {
            rules,
            engine,
            recorder,
            dispatcher,
        }
    }

    pub fn rules(&self) -> &Arc<RuleStore> {
        &self.rules
    }

    pub fn recorder(&self) -> &DecisionRecorder {
        &self.recorder
    }

    pub async fn verify(&self, req: VerifyRequest) -> VerificationReport {
        let privileged = req.privileged_tier();
        let ctx = EvaluationContext {
            subject_text: req.text,
            is_privileged_tier: privileged,
            submitted_at: req.submitted_at.unwrap_or_else(Utc::now),
        };

        let snapshot = self.rules.current();
        let verdict = self.engine.evaluate(&snapshot.rules, &ctx);
        counter!("verify_attempts_total", "decision" => verdict.decision.as_str()).increment(1);

        let (attempt, recording_error) = match self
            .recorder
            .record(
                &req.user,
                &ctx,
                &verdict,
                AccountTier::from_privileged(privileged),
            )
            .await
        {
            Ok(a) => (Some(a), None),
            Err(e) => (None, Some(e.to_string())),
        };

        let outcome = self.dispatcher.dispatch(&verdict);
        info!(
            target: "sentinel_verify",
            user_id = %req.user.user_id,
            text_id = %fingerprint(&ctx.subject_text),
            rules_version = snapshot.version,
            privileged,
            score = verdict.suspicion_score,
            decision = %verdict.decision,
            failed = verdict.failed_rules.len(),
            faulted = verdict.faulted_rules.len(),
            recorded = recording_error.is_none(),
            "verification evaluated"
        );

        VerificationReport {
            verdict,
            outcome,
            rules_version: snapshot.version,
            attempt,
            recording_error,
        }
    }
}
