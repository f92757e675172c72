//! `length_check`: fail when the text length is outside the tier's band.
//!
//! rule_data:
//! ```json
//! {
//!   "standard":   { "min_length": 20, "max_length": 2000 },
//!   "privileged": { "min_length": 20, "max_length": 4000 }
//! }
//! ```
//! `standard_user` / `nitro_user` and `min` / `max` are accepted as aliases.
//! Without a privileged band, privileged users get the standard band.
//! Length is counted in characters.

use serde::Deserialize;

use super::{decode_data, failed, EvaluationContext, Evaluator};
use crate::decision::RuleOutcome;
use crate::error::EvaluatorFault;
use crate::rules::{Rule, RuleType};

#[derive(Debug, Clone, Copy, Deserialize)]
struct Band {
    #[serde(alias = "min")]
    min_length: usize,
    #[serde(alias = "max")]
    max_length: usize,
}

#[derive(Debug, Deserialize)]
struct LengthData {
    #[serde(alias = "standard_user")]
    standard: Band,
    #[serde(default, alias = "nitro_user")]
    privileged: Option<Band>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LengthCheck;

impl Evaluator for LengthCheck {
    fn rule_type(&self) -> &'static str {
        RuleType::LENGTH_CHECK
    }

    fn evaluate(&self, rule: &Rule, ctx: &EvaluationContext) -> Result<RuleOutcome, EvaluatorFault> {
        let data: LengthData = decode_data(rule)?;
        let band = if ctx.is_privileged_tier {
            data.privileged.unwrap_or(data.standard)
        } else {
            data.standard
        };
        if band.min_length > band.max_length {
            return Err(EvaluatorFault::new(
                &rule.name,
                format!("min_length {} > max_length {}", band.min_length, band.max_length),
            ));
        }

        let len = ctx.subject_text.chars().count();
        Ok(if (band.min_length..=band.max_length).contains(&len) {
            RuleOutcome::pass(&rule.name)
        } else {
            failed(rule)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tiered_rule() -> Rule {
        Rule::new(
            "length",
            RuleType::LengthCheck,
            30.0,
            json!({
                "standard_user": { "min_length": 5, "max_length": 10 },
                "nitro_user":    { "min_length": 5, "max_length": 20 }
            }),
        )
    }

    fn eval(rule: &Rule, text: &str, privileged: bool) -> RuleOutcome {
        LengthCheck
            .evaluate(rule, &EvaluationContext::new(text, privileged))
            .unwrap()
    }

    #[test]
    fn bounds_are_inclusive() {
        let r = tiered_rule();
        assert!(eval(&r, "12345", false).passed);
        assert!(eval(&r, "1234567890", false).passed);
        assert!(!eval(&r, "1234", false).passed);
        assert!(!eval(&r, "12345678901", false).passed);
    }

    #[test]
    fn band_is_selected_by_tier() {
        let r = tiered_rule();
        let text = "x".repeat(20);
        assert!(eval(&r, &text, true).passed, "privileged max is inclusive");
        let out = eval(&r, &text, false);
        assert!(!out.passed);
        assert_eq!(out.contributed_score, 30.0);
    }

    #[test]
    fn privileged_falls_back_to_standard_band() {
        let r = Rule::new(
            "length",
            RuleType::LengthCheck,
            100.0,
            json!({ "standard": { "min": 20, "max": 500 } }),
        );
        assert!(!eval(&r, "short", true).passed);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let r = Rule::new(
            "length",
            RuleType::LengthCheck,
            1.0,
            json!({ "standard": { "min": 1, "max": 3 } }),
        );
        // 3 chars, 6 bytes
        assert!(eval(&r, "żół", false).passed);
        assert!(!eval(&r, "żółw", false).passed);
    }

    #[test]
    fn inverted_band_is_a_fault() {
        let r = Rule::new(
            "length",
            RuleType::LengthCheck,
            1.0,
            json!({ "standard": { "min": 10, "max": 3 } }),
        );
        assert!(LengthCheck
            .evaluate(&r, &EvaluationContext::new("abc", false))
            .is_err());
    }
}
