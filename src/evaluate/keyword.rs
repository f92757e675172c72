//! `keyword_blacklist`: fail when the text contains any listed keyword.
//!
//! rule_data: `{ "keywords": ["discord.gg", "free nitro"] }`

use serde::Deserialize;

use super::{decode_data, failed, normalize, EvaluationContext, Evaluator};
use crate::decision::RuleOutcome;
use crate::error::EvaluatorFault;
use crate::rules::{Rule, RuleType};

#[derive(Debug, Deserialize)]
struct KeywordData {
    keywords: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordBlacklist;

impl Evaluator for KeywordBlacklist {
    fn rule_type(&self) -> &'static str {
        RuleType::KEYWORD_BLACKLIST
    }

    fn evaluate(&self, rule: &Rule, ctx: &EvaluationContext) -> Result<RuleOutcome, EvaluatorFault> {
        let data: KeywordData = decode_data(rule)?;
        let text = normalize(&ctx.subject_text);

        let hit = data
            .keywords
            .iter()
            .map(|k| normalize(k))
            .filter(|k| !k.is_empty())
            .any(|k| text.contains(k.as_str()));

        Ok(if hit {
            failed(rule)
        } else {
            RuleOutcome::pass(&rule.name)
        })
    }
}
