use async_trait::async_trait;
use std::time::Duration;

use crate::config::TelegramConfig;
use crate::utils::error::{Result, VigiaError};

/// Delivers a text message to a destination channel. Fire-and-forget from
/// the engine's perspective: failures are logged, never retried, and never
/// affect a cycle's success or failure.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, destination: &str, text: &str) -> Result<()>;
}

/// Sends a message and swallows delivery failures, logging them.
pub async fn send_best_effort(notifier: &dyn Notifier, destination: &str, text: &str) {
    if let Err(e) = notifier.send(destination, text).await {
        tracing::warn!("Failed to deliver notification to {}: {}", destination, e);
    }
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, destination: &str, text: &str) -> Result<()> {
        let payload = serde_json::json!({
            "chat_id": destination,
            "text": text,
        });

        let response = self
            .client
            .post(self.send_message_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| VigiaError::Notify(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VigiaError::Notify(format!(
                "Telegram API returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TelegramConfig {
        TelegramConfig {
            token: "123:abc".to_string(),
            chat_id: "42".to_string(),
            api_base: "https://api.telegram.org/".to_string(),
        }
    }

    #[test]
    fn test_send_message_url() {
        let notifier = TelegramNotifier::new(&test_config()).unwrap();
        assert_eq!(
            notifier.send_message_url(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }
}
