// src/notify/mod.rs
//! Moderator alerts: payload, sink trait, and the cooldown-gated relay.

pub mod antiflutter;
pub mod discord;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

pub use antiflutter::AlertCooldown;
pub use discord::DiscordAlertSink;

/// Why moderators are being paged.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertReason {
    /// Verification attempt ended flagged/denied.
    Verification {
        decision: String,
        suspicion_score: f64,
        failed_rules: Vec<String>,
    },
    /// Real-time screening flagged a message.
    Screening { confidence: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertPayload {
    pub user_id: String,
    pub display_name: String,
    pub reason: AlertReason,
    /// Short excerpt of the offending text, already truncated.
    pub excerpt: String,
    pub ts: DateTime<Utc>,
}

impl AlertPayload {
    pub const EXCERPT_CHARS: usize = 300;

    pub fn excerpt_of(text: &str) -> String {
        let mut out: String = text.chars().take(Self::EXCERPT_CHARS).collect();
        if text.chars().count() > Self::EXCERPT_CHARS {
            out.push('…');
        }
        out
    }
}

#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, alert: &AlertPayload) -> Result<()>;
}

/// Sends alerts through `sink` unless the same user was alerted recently.
pub struct AlertRelay {
    sink: Arc<dyn AlertSink>,
    cooldown: Mutex<AlertCooldown>,
}

impl AlertRelay {
    pub fn new(sink: Arc<dyn AlertSink>, cooldown: AlertCooldown) -> Self {
        Self {
            sink,
            cooldown: Mutex::new(cooldown),
        }
    }

    /// Returns `true` when the alert was delivered.
    pub async fn relay(&self, alert: &AlertPayload) -> bool {
        let allowed = match self.cooldown.lock() {
            Ok(mut cd) => cd.try_acquire(&alert.user_id, alert.ts),
            Err(_) => true,
        };
        if !allowed {
            debug!(target: "alerts", user_id = %alert.user_id, "alert suppressed by cooldown");
            return false;
        }

        match self.sink.send(alert).await {
            Ok(()) => true,
            Err(e) => {
                warn!(target: "alerts", user_id = %alert.user_id, error = %e, "moderator alert failed");
                if let Ok(mut cd) = self.cooldown.lock() {
                    cd.release(&alert.user_id);
                }
                false
            }
        }
    }
}
