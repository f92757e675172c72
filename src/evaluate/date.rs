//! `date_check`: age gate over date-of-birth / age claims found in the text.
//!
//! rule_data:
//! ```json
//! { "min_age": 18, "keywords": ["year 9"], "require_claim": false, "day_first": true }
//! ```
//!
//! Recognized claims (case-insensitive):
//! - dates: `2004-03-05`, `2004/3/5`, `05.03.2004`, `5/3/2004`, `March 5, 2004`, `5th March 2004`
//! - birth year: `born in 2009`
//! - explicit age: `I am 17`, `I'm 17 years old`, `17yo`, `age: 17`
//!
//! A date only counts as a date of birth when a birth cue (`born`, `dob`,
//! `birthday`, `date of birth`) sits in the same clause, or when the date is
//! the whole answer. Other dates ("joined on 2020-01-01") are ignored.
//!
//! The rule fails when any claim puts the author under `min_age` at
//! `submitted_at`, when a date of birth lies in the future, when a legacy
//! keyword matches, or when `require_claim` is set and nothing was found.
//! Birth years without a day count as the youngest possible age.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{decode_data, failed, normalize, EvaluationContext, Evaluator};
use crate::decision::RuleOutcome;
use crate::error::EvaluatorFault;
use crate::rules::{Rule, RuleType};

/// Explicit ages above this are not treated as age claims.
const MAX_PLAUSIBLE_AGE: u32 = 120;

fn default_day_first() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct DateData {
    min_age: u32,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    require_claim: bool,
    #[serde(default = "default_day_first")]
    day_first: bool,
}

/// Something the author said about their age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeClaim {
    Birthdate(NaiveDate),
    BirthYear(i32),
    Age(u32),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DateCheck;

impl Evaluator for DateCheck {
    fn rule_type(&self) -> &'static str {
        RuleType::DATE_CHECK
    }

    fn evaluate(&self, rule: &Rule, ctx: &EvaluationContext) -> Result<RuleOutcome, EvaluatorFault> {
        let data: DateData = decode_data(rule)?;
        let text = normalize(&ctx.subject_text);

        let keyword_hit = data
            .keywords
            .iter()
            .map(|k| normalize(k))
            .filter(|k| !k.is_empty())
            .any(|k| text.contains(k.as_str()));
        if keyword_hit {
            return Ok(failed(rule));
        }

        let today = ctx.submitted_at.date_naive();
        let claims = extract_claims(&text, data.day_first);
        if claims.is_empty() {
            return Ok(if data.require_claim {
                failed(rule)
            } else {
                RuleOutcome::pass(&rule.name)
            });
        }

        let underage = claims.iter().any(|c| match *c {
            AgeClaim::Birthdate(dob) => dob > today || age_on(dob, today) < data.min_age as i32,
            AgeClaim::BirthYear(y) => y > today.year() || today.year() - y - 1 < data.min_age as i32,
            AgeClaim::Age(a) => a < data.min_age,
        });

        Ok(if underage {
            failed(rule)
        } else {
            RuleOutcome::pass(&rule.name)
        })
    }
}

/// Completed years between `dob` and `on`.
pub fn age_on(dob: NaiveDate, on: NaiveDate) -> i32 {
    let mut years = on.year() - dob.year();
    if (on.month(), on.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years
}

static RE_YMD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})\b").expect("ymd regex"));
static RE_DMY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[-/.](\d{1,2})[-/.](\d{4})\b").expect("dmy regex"));
static RE_DAY_MONTH_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)?(?:\s+of)?\s+([a-z]{3,9})\.?,?\s+(\d{4})\b")
        .expect("day-month regex")
});
static RE_MONTH_NAME_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b")
        .expect("month-day regex")
});
static RE_BORN_IN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bborn\s+in\s+(\d{4})\b").expect("born-in regex"));
static RE_AGE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(?:i\s+am|i'm|im)\s+(\d{1,3})(?:\s*(?:years?|yrs?|y/?o)(?:\s+old)?)?\s*(?:[.!,;]|$|\s+(?:and|but|so|from|btw)\b)",
        r"\b(\d{1,3})\s*(?:years?|yrs?)\s+old\b",
        r"\b(\d{1,3})\s*y/?o\b",
        r"\baged?\s*[:=]?\s*(\d{1,3})\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("age regex"))
    .collect()
});

const BIRTH_CUES: &[&str] = &["born", "birth", "dob", "d.o.b", "bday", "b-day"];
/// Characters searched for a cue on each side of a date.
const CUE_WINDOW_BEFORE: usize = 40;
const CUE_WINDOW_AFTER: usize = 24;

static RE_CLAUSE_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[,;!?]|\b(?:and|but|then|since|joined|when)\b|\d{4}").expect("clause regex")
});

/// Whether the date spanning `start..end` reads as the author's date of birth.
fn is_birthdate_context(text: &str, start: usize, end: usize) -> bool {
    let before = last_chars(&text[..start], CUE_WINDOW_BEFORE);
    let cue_end = BIRTH_CUES
        .iter()
        .filter_map(|cue| before.rfind(*cue).map(|i| i + cue.len()))
        .max();
    if let Some(i) = cue_end {
        if !RE_CLAUSE_BREAK.is_match(&before[i..]) {
            return true;
        }
    }

    let after = first_chars(&text[end..], CUE_WINDOW_AFTER);
    let cue_start = BIRTH_CUES.iter().filter_map(|cue| after.find(*cue)).min();
    if let Some(i) = cue_start {
        if !RE_CLAUSE_BREAK.is_match(&after[..i]) {
            return true;
        }
    }

    // A bare date as the entire answer.
    text[..start]
        .chars()
        .chain(text[end..].chars())
        .all(|ch| !ch.is_alphanumeric())
}

fn last_chars(s: &str, n: usize) -> &str {
    match s.char_indices().rev().nth(n.saturating_sub(1)) {
        Some((i, _)) => &s[i..],
        None => s,
    }
}

fn first_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Extract every age claim from normalized (lowercase) text.
pub fn extract_claims(text: &str, day_first: bool) -> Vec<AgeClaim> {
    let mut out = Vec::new();
    let birth_ctx = |c: &regex::Captures<'_>| {
        c.get(0)
            .is_some_and(|m| is_birthdate_context(text, m.start(), m.end()))
    };

    for c in RE_YMD.captures_iter(text).filter(|c| birth_ctx(c)) {
        if let Some(d) = ymd(&c[1], &c[2], &c[3]) {
            out.push(AgeClaim::Birthdate(d));
        }
    }
    for c in RE_DMY.captures_iter(text).filter(|c| birth_ctx(c)) {
        let (first, second) = if day_first { (&c[1], &c[2]) } else { (&c[2], &c[1]) };
        // Swap when the preferred order is impossible, e.g. 12/31/2005 with day_first.
        if let Some(d) = ymd(&c[3], second, first).or_else(|| ymd(&c[3], first, second)) {
            out.push(AgeClaim::Birthdate(d));
        }
    }
    for c in RE_DAY_MONTH_NAME.captures_iter(text).filter(|c| birth_ctx(c)) {
        if let Some(m) = month_number(&c[2]) {
            if let Some(d) = ymd(&c[3], &m.to_string(), &c[1]) {
                out.push(AgeClaim::Birthdate(d));
            }
        }
    }
    for c in RE_MONTH_NAME_DAY.captures_iter(text).filter(|c| birth_ctx(c)) {
        if let Some(m) = month_number(&c[1]) {
            if let Some(d) = ymd(&c[3], &m.to_string(), &c[2]) {
                out.push(AgeClaim::Birthdate(d));
            }
        }
    }
    for c in RE_BORN_IN.captures_iter(text) {
        if let Ok(y) = c[1].parse::<i32>() {
            out.push(AgeClaim::BirthYear(y));
        }
    }
    for re in RE_AGE.iter() {
        for c in re.captures_iter(text) {
            if let Ok(a) = c[1].parse::<u32>() {
                if a <= MAX_PLAUSIBLE_AGE {
                    out.push(AgeClaim::Age(a));
                }
            }
        }
    }

    out.dedup();
    out
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

fn month_number(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?;
    let n = match prefix {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}
