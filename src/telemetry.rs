// src/telemetry.rs
//! Tracing setup and log-safe helpers.

use sha2::{Digest, Sha256};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG_JSON: &str = "SENTINEL_LOG_JSON";
const DEFAULT_FILTER: &str = "sentinel_verify=info,rules=info,scoring=info,recorder=info,screen=info,alerts=info,warn";

/// Install the global subscriber. `RUST_LOG` overrides the default filter;
/// `SENTINEL_LOG_JSON=1` switches to JSON lines. Safe to call twice.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var(ENV_LOG_JSON).ok().is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Short stable id for a text. Raw subject text never goes to the logs.
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_short() {
        let a = fingerprint("my birthday is 2001-04-09");
        assert_eq!(a.len(), 12);
        assert_eq!(a, fingerprint("my birthday is 2001-04-09"));
        assert_ne!(a, fingerprint("my birthday is 2001-04-10"));
    }
}
