//! Evaluate one text against a rules file and print the verdict as JSON.
//!
//! Usage: `evaluate_rules <rules.json|rules.toml> <text> [--privileged] [--fail-closed]`

use std::sync::Arc;

use anyhow::{bail, Result};
use sentinel_verify::rules::{FileRuleSource, RuleStore};
use sentinel_verify::{EvaluationContext, EvaluatorRegistry, FaultPolicy, ScoringEngine};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).with_writer(std::io::stderr).init();

    let mut positional = Vec::new();
    let mut privileged = false;
    let mut policy = FaultPolicy::FailOpen;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--privileged" => privileged = true,
            "--fail-closed" => policy = FaultPolicy::FailClosed,
            _ => positional.push(arg),
        }
    }
    let [path, text] = positional.as_slice() else {
        bail!("usage: evaluate_rules <rules-file> <text> [--privileged] [--fail-closed]");
    };

    let store = RuleStore::new(Arc::new(FileRuleSource::new(path)));
    let set = store.load().await?;

    let engine = ScoringEngine::new(EvaluatorRegistry::with_builtins(), policy);
    let verdict = engine.evaluate(&set.rules, &EvaluationContext::new(text.as_str(), privileged));

    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}
