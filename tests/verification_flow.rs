// tests/verification_flow.rs
//
// End-to-end verification through VerificationService with in-memory
// collaborators: rule snapshot -> scoring -> recording -> dispatch.

use std::sync::Arc;

use serde_json::json;

use sentinel_verify::dispatch::{VerdictDispatcher, DEFAULT_FAILURE_TEXT, DEFAULT_SUCCESS_TEXT};
use sentinel_verify::error::StoreError;
use sentinel_verify::recorder::{
    AccountTier, AttemptRecord, DecisionRecorder, MemoryUserStore, UserIdentity, UserPatch,
    UserState, UserStore, VerificationStatus,
};
use sentinel_verify::rules::StaticRuleSource;
use sentinel_verify::{
    Decision, ProfileHints, Rule, RuleStore, RuleType, ScoringEngine, VerificationService,
    VerifyRequest,
};

async fn service_with(rules: Vec<Rule>, store: Arc<dyn UserStore>) -> VerificationService {
    let rule_store = Arc::new(RuleStore::new(Arc::new(StaticRuleSource::new(rules))));
    rule_store.load().await.expect("static rules load");
    VerificationService::new(
        rule_store,
        ScoringEngine::default(),
        DecisionRecorder::new(store),
        VerdictDispatcher::default(),
    )
}

fn request(user: &str, text: &str, privileged: bool) -> VerifyRequest {
    VerifyRequest {
        user: UserIdentity::new(user, format!("{user}-name")),
        text: text.to_string(),
        is_privileged: privileged,
        profile: None,
        submitted_at: None,
    }
}

#[tokio::test]
async fn scenario_a_invite_link_is_flagged() {
    let store = Arc::new(MemoryUserStore::new());
    let svc = service_with(
        vec![Rule::new(
            "invite links",
            RuleType::KeywordBlacklist,
            50.0,
            json!({ "keywords": ["discord.gg"] }),
        )],
        store.clone(),
    )
    .await;

    let report = svc.verify(request("u1", "join my discord.gg server", false)).await;

    assert_eq!(report.verdict.failed_rules, vec!["invite links"]);
    assert_eq!(report.verdict.suspicion_score, 50.0);
    assert_eq!(report.verdict.decision, Decision::Flagged);
    assert!(!report.outcome.grant_role);
    assert!(report.outcome.raise_alert);
    assert_eq!(report.outcome.notify_user_text, DEFAULT_FAILURE_TEXT);
    assert!(report.recorded());

    let state = store.get_user_state("u1").await.unwrap();
    assert_eq!(state.verification_status, VerificationStatus::Flagged);
    assert_eq!(state.attempts.len(), 1);
    assert_eq!(state.attempts[0].subject_text, "join my discord.gg server");
}

#[tokio::test]
async fn scenario_b_short_text_is_denied() {
    let store = Arc::new(MemoryUserStore::new());
    let svc = service_with(
        vec![Rule::new(
            "length",
            RuleType::LengthCheck,
            100.0,
            json!({ "standard": { "min": 20, "max": 500 } }),
        )],
        store.clone(),
    )
    .await;

    let report = svc.verify(request("u2", "hello", false)).await;
    assert_eq!(report.verdict.suspicion_score, 100.0);
    assert_eq!(report.verdict.decision, Decision::Denied);

    let state = store.get_user_state("u2").await.unwrap();
    assert_eq!(state.verification_status, VerificationStatus::Denied);
    assert_eq!(state.account_tier, AccountTier::Standard);
}

#[tokio::test]
async fn scenario_c_empty_rule_set_passes_anything() {
    let store = Arc::new(MemoryUserStore::new());
    let svc = service_with(Vec::new(), store.clone()).await;

    for text in ["", "x", "buy free nitro at discord.gg/scam"] {
        let report = svc.verify(request("u3", text, true)).await;
        assert_eq!(report.verdict.suspicion_score, 0.0);
        assert_eq!(report.verdict.decision, Decision::Passed);
        assert!(report.outcome.grant_role);
        assert_eq!(report.outcome.notify_user_text, DEFAULT_SUCCESS_TEXT);
    }

    let state = store.get_user_state("u3").await.unwrap();
    assert_eq!(state.attempts.len(), 3);
    assert_eq!(state.verification_status, VerificationStatus::Verified);
    assert_eq!(state.account_tier, AccountTier::Privileged);
}

#[tokio::test]
async fn repeated_attempts_overwrite_status_and_keep_history() {
    let store = Arc::new(MemoryUserStore::new());
    let svc = service_with(
        vec![Rule::new(
            "spam",
            RuleType::KeywordBlacklist,
            150.0,
            json!({ "keywords": ["free nitro"] }),
        )],
        store.clone(),
    )
    .await;

    svc.verify(request("u4", "FREE NITRO here", false)).await;
    svc.verify(request("u4", "I would like to join please", false)).await;

    let state = store.get_user_state("u4").await.unwrap();
    assert_eq!(state.verification_status, VerificationStatus::Verified);
    let decisions: Vec<Decision> = state.attempts.iter().map(|a| a.decision).collect();
    assert_eq!(decisions, vec![Decision::Denied, Decision::Passed]);
}

struct FailingStore;

#[async_trait::async_trait]
impl UserStore for FailingStore {
    async fn upsert_user_state(
        &self,
        _user_id: &str,
        _patch: UserPatch,
        _append_attempt: AttemptRecord,
    ) -> Result<UserState, StoreError> {
        Err(StoreError::Timeout)
    }

    async fn get_user_state(&self, user_id: &str) -> Result<UserState, StoreError> {
        Err(StoreError::NotFound(user_id.to_string()))
    }
}

#[tokio::test]
async fn verdict_survives_a_failed_write() {
    let svc = service_with(
        vec![Rule::new(
            "invite links",
            RuleType::KeywordBlacklist,
            50.0,
            json!({ "keywords": ["discord.gg"] }),
        )],
        Arc::new(FailingStore),
    )
    .await;

    let report = svc.verify(request("u5", "discord.gg/abc", false)).await;
    assert_eq!(report.verdict.decision, Decision::Flagged);
    assert!(report.outcome.raise_alert);
    assert!(!report.recorded());
    assert!(report.attempt.is_none());
    assert!(report.recording_error.is_some());
}

#[tokio::test]
async fn explicit_submission_time_drives_age_checks() {
    let store = Arc::new(MemoryUserStore::new());
    let svc = service_with(
        vec![Rule::new(
            "age gate",
            RuleType::DateCheck,
            100.0,
            json!({ "min_age": 13 }),
        )],
        store.clone(),
    )
    .await;

    let at = chrono::DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);

    let mut young = request("u6", "hi, I was born on 2015-02-03", false);
    young.submitted_at = Some(at);
    assert_eq!(svc.verify(young).await.verdict.decision, Decision::Denied);

    let mut old = request("u7", "hi, I was born on 1990-02-03", false);
    old.submitted_at = Some(at);
    let report = svc.verify(old).await;
    assert_eq!(report.verdict.decision, Decision::Passed);
    assert_eq!(report.attempt.unwrap().timestamp, at);
}

#[tokio::test]
async fn adult_mentioning_a_recent_date_is_not_age_gated() {
    let svc = service_with(
        vec![Rule::new(
            "age gate",
            RuleType::DateCheck,
            100.0,
            json!({ "min_age": 13 }),
        )],
        Arc::new(MemoryUserStore::new()),
    )
    .await;

    let at = chrono::DateTime::parse_from_rfc3339("2026-06-15T12:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);

    for text in [
        "I'm 25 and I joined discord on 2020-01-01",
        "joined May 3 2024 after a friend invited me",
    ] {
        let mut req = request("u8", text, false);
        req.submitted_at = Some(at);
        let report = svc.verify(req).await;
        assert_eq!(report.verdict.decision, Decision::Passed, "{text}");
    }
}

#[tokio::test]
async fn profile_perks_select_the_privileged_band() {
    let store = Arc::new(MemoryUserStore::new());
    let svc = service_with(
        vec![Rule::new(
            "length",
            RuleType::LengthCheck,
            100.0,
            json!({ "standard": { "min": 40, "max": 500 }, "privileged": { "min": 10, "max": 500 } }),
        )],
        store.clone(),
    )
    .await;
    let text = "hey there, just joining";

    let plain = svc.verify(request("u9", text, false)).await;
    assert_eq!(plain.verdict.decision, Decision::Denied);

    let mut boosted = request("u9", text, false);
    boosted.profile = Some(ProfileHints {
        boosting: true,
        ..ProfileHints::default()
    });
    assert_eq!(svc.verify(boosted).await.verdict.decision, Decision::Passed);

    let state = store.get_user_state("u9").await.unwrap();
    assert_eq!(state.account_tier, AccountTier::Privileged);
}
