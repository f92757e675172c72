//! Sentinel verification service: binary entrypoint.
//! Boots the Axum HTTP server with the rule store, scoring engine and user store
//! wired from `config/sentinel.toml`.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing::info;

use sentinel_verify::config::SentinelConfig;
use sentinel_verify::{app_from_config, telemetry};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let cfg = SentinelConfig::load_default().context("loading sentinel config")?;
    let app = app_from_config(&cfg).await?;

    info!(
        target: "sentinel_verify",
        fault_policy = ?cfg.engine.fault_policy,
        store = ?cfg.store.kind,
        classifier = cfg.classifier.url.is_some(),
        alerts = cfg.alerts.discord_webhook.is_some(),
        "sentinel service starting"
    );

    Ok(app.into())
}
