//! Rule Store: owns the active rule snapshot.
//!
//! Readers clone an `Arc<RuleSet>` and keep evaluating against it even if a
//! reload installs a newer set meanwhile. Reloads either install a complete,
//! validated set or leave the previous snapshot in place.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, gauge};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{validate_rules, RuleSet, RuleSource};
use crate::error::RuleStoreError;

pub struct RuleStore {
    source: Arc<dyn RuleSource>,
    active: RwLock<Arc<RuleSet>>,
}

impl RuleStore {
    /// Create a store serving the empty set until the first `load()`.
    pub fn new(source: Arc<dyn RuleSource>) -> Self {
        Self {
            source,
            active: RwLock::new(Arc::new(RuleSet::empty())),
        }
    }

    /// Most recently installed snapshot.
    pub fn current(&self) -> Arc<RuleSet> {
        self.active
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Fetch from the source and install atomically.
    pub async fn load(&self) -> Result<Arc<RuleSet>, RuleStoreError> {
        let fetched = match self.source.fetch_active_rules().await {
            Ok(rules) => rules,
            Err(e) => {
                self.log_rejected(&e);
                return Err(e);
            }
        };
        if let Err(e) = validate_rules(&fetched) {
            self.log_rejected(&e);
            return Err(e);
        }

        let installed = {
            let mut guard = self
                .active
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let next = Arc::new(RuleSet {
                version: guard.version + 1,
                loaded_at: Utc::now(),
                rules: fetched,
            });
            *guard = next.clone();
            next
        };

        gauge!("rules_active").set(installed.enabled_count() as f64);
        info!(
            target: "rules",
            source = self.source.name(),
            version = installed.version,
            total = installed.rules.len(),
            enabled = installed.enabled_count(),
            "rule set installed"
        );
        Ok(installed)
    }

    fn log_rejected(&self, e: &RuleStoreError) {
        counter!("rules_reload_failures_total").increment(1);
        let kept = self.current();
        warn!(
            target: "rules",
            source = self.source.name(),
            kept_version = kept.version,
            error = %e,
            "rule load failed; previous rule set stays active"
        );
    }
}

/// Reload `store` every `interval`. Failures are logged and the loop continues.
pub fn spawn_reload_task(store: Arc<RuleStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; the caller already did the initial load.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let _ = store.load().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Rule, RuleType, StaticRuleSource};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Source returning a scripted sequence of results.
    struct ScriptedSource {
        script: Mutex<Vec<Result<Vec<Rule>, RuleStoreError>>>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl RuleSource for ScriptedSource {
        async fn fetch_active_rules(&self) -> Result<Vec<Rule>, RuleStoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script.lock().unwrap().remove(0)
        }
        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn rule(name: &str, score: f64) -> Rule {
        Rule::new(name, RuleType::LengthCheck, score, Value::Null)
    }

    #[tokio::test]
    async fn starts_empty_then_installs() {
        let store = RuleStore::new(Arc::new(StaticRuleSource::new(vec![rule("a", 1.0)])));
        assert_eq!(store.current().version, 0);
        assert!(store.current().rules.is_empty());

        let set = store.load().await.unwrap();
        assert_eq!(set.version, 1);
        assert_eq!(store.current().rules.len(), 1);
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_snapshot() {
        let source = Arc::new(ScriptedSource {
            script: Mutex::new(vec![
                Ok(vec![rule("a", 1.0), rule("b", 2.0)]),
                Err(RuleStoreError::SourceUnavailable {
                    source_name: "db".into(),
                    reason: "connection refused".into(),
                }),
                Ok(vec![rule("c", 3.0), rule("broken", -5.0)]),
            ]),
            calls: AtomicUsize::new(0),
        });
        let store = RuleStore::new(source.clone());

        store.load().await.unwrap();
        let held = store.current();

        assert!(store.load().await.is_err());
        assert!(store.load().await.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);

        let now = store.current();
        assert_eq!(now.version, 1);
        assert!(Arc::ptr_eq(&held, &now));
        let names: Vec<_> = now.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
