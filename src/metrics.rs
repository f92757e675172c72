use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::decision::DENY_THRESHOLD;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Only one recorder may exist per
    /// process, so a second call fails.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("verify_attempts_total", "Verification attempts by decision");
        describe_counter!("rule_evaluator_faults_total", "Rule evaluations that faulted or panicked");
        describe_counter!("rules_reload_failures_total", "Rejected rule set loads");
        describe_counter!("screen_flagged_total", "Messages flagged by the screener");
        describe_gauge!("rules_active", "Enabled rules in the active snapshot");

        gauge!("verify_deny_threshold").set(DENY_THRESHOLD);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
