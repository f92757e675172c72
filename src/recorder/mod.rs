//! Decision Recorder: turns a verdict into an append-only audit entry and
//! folds it into the user's cumulative state.
//!
//! Persistence is delegated to a `UserStore`; the store is responsible for
//! serializing the patch + append per user so that concurrent attempts compose.

pub mod file_store;
pub mod store;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decision::{Decision, Verdict};
use crate::error::StoreError;
use crate::evaluate::EvaluationContext;
use crate::telemetry::fingerprint;

pub use file_store::FileUserStore;
pub use store::{MemoryUserStore, UserStore};

/// Immutable audit entry for one evaluation of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub timestamp: DateTime<Utc>,
    pub subject_text: String,
    pub suspicion_score: f64,
    pub passed_rules: Vec<String>,
    pub failed_rules: Vec<String>,
    pub decision: Decision,
}

impl AttemptRecord {
    pub fn from_verdict(ctx: &EvaluationContext, verdict: &Verdict) -> Self {
        Self {
            timestamp: ctx.submitted_at,
            subject_text: ctx.subject_text.clone(),
            suspicion_score: verdict.suspicion_score,
            passed_rules: verdict.passed_rules.clone(),
            failed_rules: verdict.failed_rules.clone(),
            decision: verdict.decision,
        }
    }
}

/// Stored status; mirrors `Decision` with `passed → verified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Verified,
    Flagged,
    Denied,
}

impl From<Decision> for VerificationStatus {
    fn from(d: Decision) -> Self {
        match d {
            Decision::Passed => VerificationStatus::Verified,
            Decision::Flagged => VerificationStatus::Flagged,
            Decision::Denied => VerificationStatus::Denied,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountTier {
    #[default]
    Standard,
    #[serde(alias = "nitro")]
    Privileged,
}

impl AccountTier {
    pub fn from_privileged(is_privileged: bool) -> Self {
        if is_privileged {
            AccountTier::Privileged
        } else {
            AccountTier::Standard
        }
    }
}

/// Cumulative per-user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    pub user_id: String,
    pub display_name: String,
    pub verification_status: VerificationStatus,
    pub last_interaction: DateTime<Utc>,
    pub account_tier: AccountTier,
    #[serde(default)]
    pub attempts: Vec<AttemptRecord>,
}

/// Fields overwritten on every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct UserPatch {
    pub display_name: String,
    pub verification_status: VerificationStatus,
    pub last_interaction: DateTime<Utc>,
    pub account_tier: AccountTier,
}

impl UserPatch {
    /// Apply to an existing state, or create one, then append `attempt`.
    pub fn apply(self, user_id: &str, current: Option<UserState>, attempt: AttemptRecord) -> UserState {
        let mut state = current.unwrap_or_else(|| UserState {
            user_id: user_id.to_string(),
            display_name: String::new(),
            verification_status: self.verification_status,
            last_interaction: self.last_interaction,
            account_tier: self.account_tier,
            attempts: Vec::new(),
        });
        state.display_name = self.display_name;
        state.verification_status = self.verification_status;
        state.last_interaction = self.last_interaction;
        state.account_tier = self.account_tier;
        state.attempts.push(attempt);
        state
    }
}

/// Who the attempt belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
}

impl UserIdentity {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Clone)]
pub struct DecisionRecorder {
    store: Arc<dyn UserStore>,
}

impl DecisionRecorder {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Build the attempt, append it and patch the user's state in one store call.
    pub async fn record(
        &self,
        user: &UserIdentity,
        ctx: &EvaluationContext,
        verdict: &Verdict,
        account_tier: AccountTier,
    ) -> Result<AttemptRecord, StoreError> {
        let attempt = AttemptRecord::from_verdict(ctx, verdict);
        let patch = UserPatch {
            display_name: user.display_name.clone(),
            verification_status: verdict.decision.into(),
            last_interaction: Utc::now(),
            account_tier,
        };

        match self
            .store
            .upsert_user_state(&user.user_id, patch, attempt.clone())
            .await
        {
            Ok(state) => {
                debug!(
                    target: "recorder",
                    user_id = %user.user_id,
                    attempts = state.attempts.len(),
                    status = ?state.verification_status,
                    text_id = %fingerprint(&ctx.subject_text),
                    "attempt recorded"
                );
                Ok(attempt)
            }
            Err(e) => {
                warn!(
                    target: "recorder",
                    user_id = %user.user_id,
                    decision = %verdict.decision,
                    error = %e,
                    "attempt not persisted"
                );
                Err(e)
            }
        }
    }
}
