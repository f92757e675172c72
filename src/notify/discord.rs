use super::{AlertPayload, AlertReason, AlertSink};
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const ALERT_COLOR_RED: u32 = 0xff0000;

/// Posts moderator alerts to a Discord webhook as a single embed.
#[derive(Clone)]
pub struct DiscordAlertSink {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DiscordAlertSink {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }
}

#[async_trait::async_trait]
impl AlertSink for DiscordAlertSink {
    async fn send(&self, alert: &AlertPayload) -> Result<()> {
        let payload = DiscordWebhookPayload::from_alert(alert);

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status_ref() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("Discord webhook HTTP error: {e}"),
                },
                Err(e) => anyhow!("Discord webhook request failed: {e}"),
            };
            if attempt >= self.max_retries {
                return Err(err);
            }
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    color: u32,
    fields: Vec<EmbedField>,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct DiscordWebhookPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordWebhookPayload {
    fn from_alert(alert: &AlertPayload) -> Self {
        let user = format!("{} (`{}`)", alert.display_name, alert.user_id);
        let mut fields = vec![EmbedField {
            name: "User".into(),
            value: user,
            inline: true,
        }];

        let description = match &alert.reason {
            AlertReason::Verification {
                decision,
                suspicion_score,
                failed_rules,
            } => {
                fields.push(EmbedField {
                    name: "Score".into(),
                    value: format!("`{suspicion_score:.1}`"),
                    inline: true,
                });
                let rules = if failed_rules.is_empty() {
                    "none".to_string()
                } else {
                    failed_rules.join(" · ")
                };
                fields.push(EmbedField {
                    name: "Failed rules".into(),
                    value: rules,
                    inline: false,
                });
                format!("Verification attempt was **{decision}**.")
            }
            AlertReason::Screening { confidence } => {
                fields.push(EmbedField {
                    name: "Confidence".into(),
                    value: format!("`{:.2}%`", confidence * 100.0),
                    inline: true,
                });
                "A message has been flagged as potentially originating from a minor.".to_string()
            }
        };

        fields.push(EmbedField {
            name: "Original Message".into(),
            value: format!("> {}", alert.excerpt),
            inline: false,
        });

        Self {
            content: None,
            embeds: vec![DiscordEmbed {
                title: "Sentinel Alert".into(),
                description,
                color: ALERT_COLOR_RED,
                fields,
                timestamp: alert.ts.to_rfc3339(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn verification_alert_embed_lists_failed_rules() {
        let alert = AlertPayload {
            user_id: "42".into(),
            display_name: "alice".into(),
            reason: AlertReason::Verification {
                decision: "denied".into(),
                suspicion_score: 150.0,
                failed_rules: vec!["length".into(), "age gate".into()],
            },
            excerpt: "hi".into(),
            ts: Utc::now(),
        };
        let v = serde_json::to_value(DiscordWebhookPayload::from_alert(&alert)).unwrap();
        let embed = &v["embeds"][0];
        assert_eq!(embed["color"], serde_json::json!(0xff0000));
        assert!(embed["description"].as_str().unwrap().contains("denied"));
        assert_eq!(embed["fields"][2]["value"], "length · age gate");
        assert_eq!(embed["fields"][3]["value"], "> hi");
    }
}
