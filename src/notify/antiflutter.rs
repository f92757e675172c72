// src/notify/antiflutter.rs
use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// Per-user cooldown gate for moderator alerts.
/// - First alert for a user always allowed.
/// - Inside that user's cooldown, alerts are suppressed.
/// - Other users are unaffected.
#[derive(Debug, Clone, Default)]
pub struct AlertCooldown {
    cooldown: ChronoDuration,
    last_alert: HashMap<String, DateTime<Utc>>,
}

impl AlertCooldown {
    /// `cooldown_secs` < 0 is treated as 0 (no cooldown).
    pub fn new(cooldown_secs: i64) -> Self {
        Self {
            cooldown: ChronoDuration::seconds(cooldown_secs.max(0)),
            last_alert: HashMap::new(),
        }
    }

    /// Check without mutating.
    pub fn would_allow(&self, user_id: &str, now: DateTime<Utc>) -> bool {
        match self.last_alert.get(user_id) {
            None => true,
            Some(ts) => now.signed_duration_since(*ts) >= self.cooldown,
        }
    }

    /// Check and, if allowed, record `now` for the user.
    pub fn try_acquire(&mut self, user_id: &str, now: DateTime<Utc>) -> bool {
        if !self.would_allow(user_id, now) {
            return false;
        }
        self.last_alert.insert(user_id.to_string(), now);
        self.prune(now);
        true
    }

    /// Forget the user's last alert (e.g. the send failed).
    pub fn release(&mut self, user_id: &str) {
        self.last_alert.remove(user_id);
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let cd = self.cooldown;
        self.last_alert
            .retain(|_, ts| now.signed_duration_since(*ts) < cd);
    }
}
