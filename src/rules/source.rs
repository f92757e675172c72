// src/rules/source.rs
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::Rule;
use crate::error::RuleStoreError;

/// Backing store the rule set is fetched from (file, admin API, database).
#[async_trait::async_trait]
pub trait RuleSource: Send + Sync {
    async fn fetch_active_rules(&self) -> Result<Vec<Rule>, RuleStoreError>;
    fn name(&self) -> &str;
}

/// Rules read from a JSON or TOML file on every fetch.
///
/// Accepted shapes:
/// - JSON array of rules
/// - JSON object `{ "rules": [...] }`
/// - TOML with `[[rules]]` tables
#[derive(Debug, Clone)]
pub struct FileRuleSource {
    path: PathBuf,
}

impl FileRuleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl RuleSource for FileRuleSource {
    async fn fetch_active_rules(&self) -> Result<Vec<Rule>, RuleStoreError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            RuleStoreError::SourceUnavailable {
                source_name: self.path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        let ext = self
            .path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_rules(&content, &ext)
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Fixed in-memory rules; useful for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRuleSource {
    rules: Vec<Rule>,
}

impl StaticRuleSource {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}

#[async_trait::async_trait]
impl RuleSource for StaticRuleSource {
    async fn fetch_active_rules(&self) -> Result<Vec<Rule>, RuleStoreError> {
        Ok(self.rules.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Wrapped form. `rules` is required and no other key is allowed, so a
/// mis-keyed document is rejected instead of loading as an empty set.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RulesDoc {
    rules: Vec<Rule>,
}

/// Parse a rules document. `hint_ext` picks the first format tried.
pub fn parse_rules(s: &str, hint_ext: &str) -> Result<Vec<Rule>, RuleStoreError> {
    let try_toml_first = hint_ext == "toml";
    if try_toml_first {
        if let Ok(doc) = toml::from_str::<RulesDoc>(s) {
            return Ok(doc.rules);
        }
    }

    let json_err = match serde_json::from_str::<Vec<Rule>>(s) {
        Ok(v) => return Ok(v),
        Err(_) => match serde_json::from_str::<RulesDoc>(s) {
            Ok(doc) => return Ok(doc.rules),
            Err(e) => e,
        },
    };

    if !try_toml_first {
        if let Ok(doc) = toml::from_str::<RulesDoc>(s) {
            return Ok(doc.rules);
        }
    }

    Err(RuleStoreError::InvalidRuleSet(format!(
        "unsupported rules document: {json_err}"
    )))
}
