// src/api.rs
//! HTTP surface the chat bot talks to. Handlers only translate between JSON
//! and the service layer; platform effects stay with the caller.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::classifier::{
    build_classifier, Classification, MessageScreener, ScreenParams, ScreenRequest,
    ScreeningOutcome,
};
use crate::config::{SentinelConfig, StoreKind};
use crate::dispatch::VerdictDispatcher;
use crate::error::{ClassifierError, StoreError};
use crate::evaluate::EvaluatorRegistry;
use crate::metrics::Metrics;
use crate::notify::{AlertCooldown, AlertPayload, AlertReason, AlertRelay, DiscordAlertSink};
use crate::recorder::{DecisionRecorder, FileUserStore, MemoryUserStore, UserState, UserStore};
use crate::rules::{spawn_reload_task, FileRuleSource, RuleSet, RuleStore};
use crate::scoring::ScoringEngine;
use crate::service::{VerificationReport, VerificationService, VerifyRequest};

#[derive(Clone)]
pub struct AppState {
    service: Arc<VerificationService>,
    screener: Arc<MessageScreener>,
    alerts: Option<Arc<AlertRelay>>,
}

impl AppState {
    pub fn new(
        service: Arc<VerificationService>,
        screener: Arc<MessageScreener>,
        alerts: Option<Arc<AlertRelay>>,
    ) -> Self {
        Self {
            service,
            screener,
            alerts,
        }
    }

    /// Wire every component from config. A failing initial rule load is
    /// logged and the service starts with the empty rule set.
    pub async fn from_config(cfg: &SentinelConfig) -> Result<Self> {
        cfg.validate()?;

        let rules_path = cfg
            .rules
            .path
            .clone()
            .context("rules.path missing after validation")?;
        let rules = Arc::new(RuleStore::new(Arc::new(FileRuleSource::new(rules_path))));
        if rules.load().await.is_err() {
            warn!(target: "rules", "starting with an empty rule set");
        }
        if let Some(secs) = cfg.rules.reload_secs {
            spawn_reload_task(rules.clone(), Duration::from_secs(secs));
        }

        let store: Arc<dyn UserStore> = match cfg.store.kind {
            StoreKind::Memory => Arc::new(MemoryUserStore::new()),
            StoreKind::File => {
                let dir = cfg
                    .store
                    .dir
                    .clone()
                    .context("store.dir missing after validation")?;
                Arc::new(
                    FileUserStore::open(&dir)
                        .await
                        .with_context(|| format!("opening user store at {}", dir.display()))?,
                )
            }
        };

        let engine = ScoringEngine::new(EvaluatorRegistry::with_builtins(), cfg.engine.fault_policy);
        let service = VerificationService::new(
            rules,
            engine,
            DecisionRecorder::new(store),
            VerdictDispatcher::new(cfg.dispatch.clone()),
        );

        let classifier = build_classifier(
            cfg.classifier.url.as_deref(),
            Duration::from_secs(cfg.classifier.timeout_secs),
        )?;
        let screener = MessageScreener::new(
            classifier,
            ScreenParams {
                confidence_threshold: cfg.classifier.confidence_threshold,
                min_length: cfg.classifier.min_length,
            },
        );

        let alerts = cfg.alerts.discord_webhook.as_ref().map(|w| {
            Arc::new(AlertRelay::new(
                Arc::new(DiscordAlertSink::new(w.clone())),
                AlertCooldown::new(cfg.alerts.cooldown_secs),
            ))
        });

        Ok(Self::new(Arc::new(service), Arc::new(screener), alerts))
    }
}

/// Full service router including `/metrics`. The recorder is installed
/// before wiring so gauges set during the initial rule load are exported.
pub async fn app_from_config(cfg: &SentinelConfig) -> Result<Router> {
    let metrics = Metrics::init()?;
    let state = AppState::from_config(cfg)
        .await
        .context("wiring verification service")?;
    Ok(router(state).merge(metrics.router()))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/verify", post(verify))
        .route("/screen", post(screen))
        .route("/classify", post(classify))
        .route("/users/{id}", get(get_user))
        .route("/rules", get(get_rules))
        .route("/admin/reload-rules", post(reload_rules))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, kind: &str, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
            kind: kind.to_string(),
        }),
    )
}

async fn verify(State(state): State<AppState>, Json(req): Json<VerifyRequest>) -> Json<VerificationReport> {
    let user = req.user.clone();
    let excerpt = AlertPayload::excerpt_of(&req.text);
    let report = state.service.verify(req).await;

    if report.outcome.raise_alert {
        if let Some(relay) = state.alerts.clone() {
            let alert = AlertPayload {
                user_id: user.user_id,
                display_name: user.display_name,
                reason: AlertReason::Verification {
                    decision: report.verdict.decision.to_string(),
                    suspicion_score: report.verdict.suspicion_score,
                    failed_rules: report.verdict.failed_rules.clone(),
                },
                excerpt,
                ts: Utc::now(),
            };
            tokio::spawn(async move {
                relay.relay(&alert).await;
            });
        }
    }

    Json(report)
}

#[derive(Debug, Deserialize)]
struct ScreenBody {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    display_name: String,
    #[serde(flatten)]
    request: ScreenRequest,
}

async fn screen(
    State(state): State<AppState>,
    Json(body): Json<ScreenBody>,
) -> Result<Json<ScreeningOutcome>, ApiError> {
    let outcome = state
        .screener
        .screen(&body.request)
        .await
        .map_err(classifier_error)?;

    if let (ScreeningOutcome::Flagged { confidence }, Some(relay)) = (&outcome, state.alerts.clone()) {
        let alert = AlertPayload {
            user_id: body.user_id,
            display_name: body.display_name,
            reason: AlertReason::Screening {
                confidence: *confidence,
            },
            excerpt: AlertPayload::excerpt_of(&body.request.text),
            ts: Utc::now(),
        };
        tokio::spawn(async move {
            relay.relay(&alert).await;
        });
    }

    Ok(Json(outcome))
}

fn classifier_error(e: ClassifierError) -> ApiError {
    match e {
        ClassifierError::Unavailable(_) => {
            api_error(StatusCode::SERVICE_UNAVAILABLE, "classifier_unavailable", e)
        }
        ClassifierError::Timeout => api_error(StatusCode::GATEWAY_TIMEOUT, "classifier_timeout", e),
        ClassifierError::Status(_) | ClassifierError::Decode(_) => {
            api_error(StatusCode::BAD_GATEWAY, "classifier_error", e)
        }
        ClassifierError::InvalidInput(_) => api_error(StatusCode::BAD_REQUEST, "invalid_input", e),
    }
}

#[derive(Debug, Deserialize)]
struct ClassifyBody {
    text: String,
}

/// On-demand moderator analysis; reports the classifier answer verbatim.
async fn classify(
    State(state): State<AppState>,
    Json(body): Json<ClassifyBody>,
) -> Result<Json<Classification>, ApiError> {
    state
        .screener
        .analyze(&body.text)
        .await
        .map(Json)
        .map_err(classifier_error)
}

async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<UserState>, ApiError> {
    state
        .service
        .recorder()
        .store()
        .get_user_state(&id)
        .await
        .map(Json)
        .map_err(|e| match e {
            StoreError::NotFound(_) => api_error(StatusCode::NOT_FOUND, "not_found", e),
            StoreError::Timeout => api_error(StatusCode::GATEWAY_TIMEOUT, "persistence_timeout", e),
            StoreError::Persistence(_) => {
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", e)
            }
        })
}

async fn get_rules(State(state): State<AppState>) -> Json<RuleSet> {
    Json(state.service.rules().current().as_ref().clone())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResp {
    pub version: u64,
    pub rules: usize,
    pub enabled: usize,
}

async fn reload_rules(State(state): State<AppState>) -> Result<Json<ReloadResp>, ApiError> {
    let set = state
        .service
        .rules()
        .load()
        .await
        .map_err(|e| api_error(StatusCode::SERVICE_UNAVAILABLE, "rule_load_failed", e))?;
    Ok(Json(ReloadResp {
        version: set.version,
        rules: set.rules.len(),
        enabled: set.enabled_count(),
    }))
}
