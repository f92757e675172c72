// src/config/sentinel.rs
//! Service configuration (`config/sentinel.toml`).
//!
//! ```toml
//! [rules]
//! path = "config/rules.json"
//! reload_secs = 300
//!
//! [store]
//! kind = "file"          # "file" | "memory"
//! dir = "state/users"
//!
//! [engine]
//! fault_policy = "fail_open"
//!
//! [classifier]
//! url = "http://127.0.0.1:5000/predict"
//! timeout_secs = 10
//! confidence_threshold = 0.8
//! min_length = 10
//!
//! [dispatch]
//! alert_on_flagged = true
//!
//! [alerts]
//! discord_webhook = "ENV"   # read DISCORD_ALERT_WEBHOOK
//! cooldown_secs = 600
//! ```

use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::classifier::screen::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MIN_LENGTH};
use crate::dispatch::DispatchPolicy;
use crate::scoring::FaultPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "config/sentinel.toml";
pub const ENV_CONFIG_PATH: &str = "SENTINEL_CONFIG_PATH";
pub const ENV_RULES_PATH: &str = "SENTINEL_RULES_PATH";
pub const ENV_STORE_DIR: &str = "SENTINEL_STORE_DIR";
pub const ENV_CLASSIFIER_URL: &str = "SENTINEL_API_URL";
pub const ENV_ALERT_WEBHOOK: &str = "DISCORD_ALERT_WEBHOOK";

fn default_timeout_secs() -> u64 {
    10
}
fn default_confidence_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}
fn default_min_length() -> usize {
    DEFAULT_MIN_LENGTH
}
fn default_cooldown_secs() -> i64 {
    600
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesSection {
    pub path: Option<PathBuf>,
    /// Periodic reload interval; `None` or 0 disables the reload task.
    #[serde(default)]
    pub reload_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default)]
    pub kind: StoreKind,
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(default)]
    pub fault_policy: FaultPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSection {
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_timeout_secs(),
            confidence_threshold: default_confidence_threshold(),
            min_length: default_min_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsSection {
    /// Webhook URL, or "ENV" to read `DISCORD_ALERT_WEBHOOK`.
    pub discord_webhook: Option<String>,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: i64,
}

impl Default for AlertsSection {
    fn default() -> Self {
        Self {
            discord_webhook: None,
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentinelConfig {
    #[serde(default)]
    pub rules: RulesSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub classifier: ClassifierSection,
    #[serde(default)]
    pub dispatch: DispatchPolicy,
    #[serde(default)]
    pub alerts: AlertsSection,
}

impl SentinelConfig {
    /// `$SENTINEL_CONFIG_PATH`, else `config/sentinel.toml`; a missing default
    /// file yields defaults (env overrides may still complete it).
    pub fn load_default() -> Result<Self> {
        match env::var(ENV_CONFIG_PATH) {
            Ok(p) => Self::load_from_file(p),
            Err(_) => {
                let p = Path::new(DEFAULT_CONFIG_PATH);
                if p.exists() {
                    Self::load_from_file(p)
                } else {
                    let mut cfg = Self::default();
                    cfg.apply_env()?;
                    cfg.validate()?;
                    Ok(cfg)
                }
            }
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg = Self::from_toml_str(&data)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: SentinelConfig = toml::from_str(s).context("parsing sentinel config")?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Environment overrides and "ENV" secret resolution.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(p) = env::var(ENV_RULES_PATH) {
            self.rules.path = Some(PathBuf::from(p));
        }
        if let Ok(d) = env::var(ENV_STORE_DIR) {
            self.store.dir = Some(PathBuf::from(d));
        }
        if let Ok(u) = env::var(ENV_CLASSIFIER_URL) {
            self.classifier.url = Some(u);
        }
        if let Some(w) = &self.alerts.discord_webhook {
            if w.trim().eq_ignore_ascii_case("env") {
                let resolved = env::var(ENV_ALERT_WEBHOOK)
                    .map_err(|_| anyhow::anyhow!("Missing {ENV_ALERT_WEBHOOK} env var"))?;
                self.alerts.discord_webhook = Some(resolved);
            }
        }
        Ok(())
    }

    /// Only configuration-level absence is fatal.
    pub fn validate(&self) -> Result<()> {
        if self.rules.path.is_none() {
            bail!("no rule source configured: set [rules].path or {ENV_RULES_PATH}");
        }
        if self.store.kind == StoreKind::File && self.store.dir.is_none() {
            bail!("no persistence target configured: set [store].dir or {ENV_STORE_DIR}");
        }
        Ok(())
    }

    fn sanitize(&mut self) {
        if !(0.0..=1.0).contains(&self.classifier.confidence_threshold) {
            self.classifier.confidence_threshold = default_confidence_threshold();
        }
        if self.classifier.timeout_secs == 0 {
            self.classifier.timeout_secs = default_timeout_secs();
        }
        if self.rules.reload_secs == Some(0) {
            self.rules.reload_secs = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[rules]
path = "config/rules.json"
reload_secs = 0

[store]
kind = "memory"

[engine]
fault_policy = "fail_closed"

[classifier]
url = "http://127.0.0.1:5000/predict"
confidence_threshold = 7.0

[dispatch]
failure_text = "Nope."
alert_on_flagged = false
"#;

    #[test]
    fn parses_and_sanitizes() {
        let cfg = SentinelConfig::from_toml_str(FULL).unwrap();
        assert_eq!(cfg.store.kind, StoreKind::Memory);
        assert_eq!(cfg.engine.fault_policy, FaultPolicy::FailClosed);
        assert_eq!(cfg.rules.reload_secs, None);
        assert_eq!(cfg.classifier.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(cfg.classifier.min_length, DEFAULT_MIN_LENGTH);
        assert_eq!(cfg.dispatch.failure_text, "Nope.");
        assert!(!cfg.dispatch.alert_on_flagged);
        assert!(cfg.dispatch.alert_on_denied);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_rule_source_is_fatal() {
        let cfg = SentinelConfig::from_toml_str("[store]\nkind = \"memory\"\n").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn file_store_without_dir_is_fatal() {
        let cfg = SentinelConfig::from_toml_str("[rules]\npath = \"r.json\"\n").unwrap();
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("persistence"), "{err}");
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_and_env_secret() {
        env::set_var(ENV_RULES_PATH, "/tmp/rules.toml");
        env::set_var(ENV_ALERT_WEBHOOK, "https://discord.test/webhook");
        let mut cfg = SentinelConfig::from_toml_str(
            "[store]\nkind = \"memory\"\n[alerts]\ndiscord_webhook = \"ENV\"\n",
        )
        .unwrap();
        cfg.apply_env().unwrap();
        env::remove_var(ENV_RULES_PATH);
        env::remove_var(ENV_ALERT_WEBHOOK);

        assert_eq!(cfg.rules.path, Some(PathBuf::from("/tmp/rules.toml")));
        assert_eq!(
            cfg.alerts.discord_webhook.as_deref(),
            Some("https://discord.test/webhook")
        );
        assert!(cfg.validate().is_ok());
    }
}
