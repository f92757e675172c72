//! Verification rules and the immutable rule-set snapshot.
//!
//! Document shape (one entry per rule, JSON or TOML):
//! ```json
//! {
//!   "id": "invite-links",
//!   "name": "No invite links",
//!   "type": "keyword_blacklist",
//!   "score": 50,
//!   "rule_data": { "keywords": ["discord.gg"] },
//!   "enabled": true
//! }
//! ```
//! `rule_data` is opaque here; each evaluator decodes its own payload.

pub mod source;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::RuleStoreError;

pub use source::{FileRuleSource, RuleSource, StaticRuleSource};
pub use store::{spawn_reload_task, RuleStore};

/// Rule type identifier. Unrecognized identifiers are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleType {
    KeywordBlacklist,
    LengthCheck,
    DateCheck,
    Other(String),
}

impl RuleType {
    pub const KEYWORD_BLACKLIST: &'static str = "keyword_blacklist";
    pub const LENGTH_CHECK: &'static str = "length_check";
    pub const DATE_CHECK: &'static str = "date_check";

    pub fn parse(id: &str) -> Self {
        match id.trim().to_ascii_lowercase().as_str() {
            Self::KEYWORD_BLACKLIST => RuleType::KeywordBlacklist,
            Self::LENGTH_CHECK => RuleType::LengthCheck,
            Self::DATE_CHECK => RuleType::DateCheck,
            _ => RuleType::Other(id.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RuleType::KeywordBlacklist => Self::KEYWORD_BLACKLIST,
            RuleType::LengthCheck => Self::LENGTH_CHECK,
            RuleType::DateCheck => Self::DATE_CHECK,
            RuleType::Other(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for RuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RuleType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RuleType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(RuleType::parse(&s))
    }
}

fn default_enabled() -> bool {
    true
}

/// A named, weighted policy check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub score: f64,
    #[serde(default)]
    pub rule_data: Value,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Rule {
    pub fn new(name: impl Into<String>, rule_type: RuleType, score: f64, rule_data: Value) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            rule_type,
            score,
            rule_data,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Immutable snapshot of the active rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSet {
    pub version: u64,
    pub loaded_at: DateTime<Utc>,
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// The snapshot served before the first successful load.
    pub fn empty() -> Self {
        Self {
            version: 0,
            loaded_at: Utc::now(),
            rules: Vec::new(),
        }
    }

    pub fn enabled_count(&self) -> usize {
        self.rules.iter().filter(|r| r.enabled).count()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Reject the whole set if any rule breaks the load invariants.
pub fn validate_rules(rules: &[Rule]) -> Result<(), RuleStoreError> {
    for (idx, rule) in rules.iter().enumerate() {
        if rule.name.trim().is_empty() {
            return Err(RuleStoreError::InvalidRuleSet(format!(
                "rule #{idx} has an empty name"
            )));
        }
        if !rule.score.is_finite() || rule.score < 0.0 {
            return Err(RuleStoreError::InvalidRuleSet(format!(
                "rule '{}' has invalid score {}",
                rule.name, rule.score
            )));
        }
    }
    Ok(())
}
