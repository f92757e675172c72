//! Verdict Dispatcher: verdict → side-effect intents for the host.
//!
//! Pure mapping. The host (chat bot) performs the reply, the role grant and
//! the moderator alert; nothing here touches the network.

use serde::{Deserialize, Serialize};

use crate::decision::{Decision, Verdict};

pub const DEFAULT_SUCCESS_TEXT: &str =
    "Verification successful. You have been granted the verified role!";
pub const DEFAULT_FAILURE_TEXT: &str = "Verification failed. Please try again.";

/// Intent handed to the presentation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeDescriptor {
    pub notify_user_text: String,
    pub grant_role: bool,
    pub raise_alert: bool,
}

fn default_success_text() -> String {
    DEFAULT_SUCCESS_TEXT.to_string()
}
fn default_failure_text() -> String {
    DEFAULT_FAILURE_TEXT.to_string()
}
fn default_true() -> bool {
    true
}

/// Reply texts and which failures should page moderators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchPolicy {
    #[serde(default = "default_success_text")]
    pub success_text: String,
    #[serde(default = "default_failure_text")]
    pub failure_text: String,
    #[serde(default = "default_true")]
    pub alert_on_flagged: bool,
    #[serde(default = "default_true")]
    pub alert_on_denied: bool,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            success_text: default_success_text(),
            failure_text: default_failure_text(),
            alert_on_flagged: true,
            alert_on_denied: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VerdictDispatcher {
    policy: DispatchPolicy,
}

impl VerdictDispatcher {
    pub fn new(policy: DispatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    pub fn dispatch(&self, verdict: &Verdict) -> OutcomeDescriptor {
        match verdict.decision {
            Decision::Passed => OutcomeDescriptor {
                notify_user_text: self.policy.success_text.clone(),
                grant_role: true,
                raise_alert: false,
            },
            Decision::Flagged => OutcomeDescriptor {
                notify_user_text: self.policy.failure_text.clone(),
                grant_role: false,
                raise_alert: self.policy.alert_on_flagged,
            },
            Decision::Denied => OutcomeDescriptor {
                notify_user_text: self.policy.failure_text.clone(),
                grant_role: false,
                raise_alert: self.policy.alert_on_denied,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::RuleOutcome;

    fn verdict(score: f64) -> Verdict {
        if score == 0.0 {
            Verdict::empty()
        } else {
            Verdict::from_outcomes(vec![RuleOutcome::fail("r", score)])
        }
    }

    #[test]
    fn passed_grants_role_without_alert() {
        let out = VerdictDispatcher::default().dispatch(&verdict(0.0));
        assert!(out.grant_role);
        assert!(!out.raise_alert);
        assert_eq!(out.notify_user_text, DEFAULT_SUCCESS_TEXT);
    }

    #[test]
    fn failures_never_grant_and_alert_by_default() {
        let d = VerdictDispatcher::default();
        for score in [50.0, 100.0] {
            let out = d.dispatch(&verdict(score));
            assert!(!out.grant_role);
            assert!(out.raise_alert);
            assert_eq!(out.notify_user_text, DEFAULT_FAILURE_TEXT);
        }
    }

    #[test]
    fn policy_can_silence_flagged_alerts() {
        let d = VerdictDispatcher::new(DispatchPolicy {
            alert_on_flagged: false,
            ..Default::default()
        });
        assert!(!d.dispatch(&verdict(10.0)).raise_alert);
        assert!(d.dispatch(&verdict(150.0)).raise_alert);
    }
}
