// tests/metrics_export.rs
//
// The global Prometheus recorder can only be installed once per process, so
// this file holds a single test that wires the full app from config.

use std::fs;

use axum::body::{self, Body};
use http::{Request, StatusCode};
use tempfile::tempdir;
use tower::ServiceExt as _;

use sentinel_verify::app_from_config;
use sentinel_verify::config::SentinelConfig;

fn gauge_value(exposition: &str, name: &str) -> Option<f64> {
    exposition
        .lines()
        .find_map(|l| l.strip_prefix(name)?.strip_prefix(' ')?.trim().parse().ok())
}

#[tokio::test]
async fn startup_gauges_are_exported() {
    let dir = tempdir().unwrap();
    let rules = dir.path().join("rules.json");
    fs::write(
        &rules,
        r#"[{ "name": "invite", "type": "keyword_blacklist", "score": 50,
             "rule_data": { "keywords": ["discord.gg"] } },
           { "name": "off", "type": "keyword_blacklist", "score": 50, "enabled": false,
             "rule_data": { "keywords": ["x"] } }]"#,
    )
    .unwrap();
    let toml = format!(
        "[rules]\npath = {:?}\n\n[store]\nkind = \"memory\"\n",
        rules.display().to_string()
    );
    let cfg = SentinelConfig::from_toml_str(&toml).expect("parse config");

    let app = app_from_config(&cfg).await.expect("wire app");

    let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert_eq!(gauge_value(&text, "rules_active"), Some(1.0), "{text}");
    assert_eq!(gauge_value(&text, "verify_deny_threshold"), Some(100.0), "{text}");
}
