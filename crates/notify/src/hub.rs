//! Notification fan-out. Every configured channel gets every event; a
//! failing channel is logged and never blocks the others or the engine.

use async_trait::async_trait;
use slotwatch_core::config::NotifyConfig;
use tracing::{info, warn};

/// The side-channel observability capability consumed by the engine.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, message: &str);
}

pub struct NotifyHub {
    config: NotifyConfig,
    client: reqwest::Client,
}

impl NotifyHub {
    pub fn new(config: NotifyConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for NotifyHub {
    async fn notify(&self, title: &str, message: &str) {
        info!(title = title, "Sending notification");

        if !self.config.sendgrid.api_key.is_empty() {
            if let Err(e) =
                crate::sendgrid::send(&self.client, &self.config.sendgrid, title, message).await
            {
                warn!(error = %e, "SendGrid notification failed");
            }
        }
        if !self.config.pushover.token.is_empty() {
            if let Err(e) =
                crate::pushover::send(&self.client, &self.config.pushover, title, message).await
            {
                warn!(error = %e, "Pushover notification failed");
            }
        }
        if !self.config.webhook.url.is_empty() {
            if let Err(e) =
                crate::webhook::send(&self.client, &self.config.webhook, title, message).await
            {
                warn!(error = %e, "Webhook notification failed");
            }
        }
    }
}

/// (channel name, configured) pairs for the `status` command.
pub fn channel_status(config: &NotifyConfig) -> Vec<(&'static str, bool)> {
    vec![
        ("sendgrid", !config.sendgrid.api_key.is_empty()),
        ("pushover", !config.pushover.token.is_empty()),
        ("webhook", !config.webhook.url.is_empty()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_config_sends_nothing_and_does_not_fail() {
        let hub = NotifyHub::new(NotifyConfig::default());
        hub.notify("TEST", "no channels configured").await;
    }

    #[test]
    fn channel_status_reflects_configuration() {
        let mut config = NotifyConfig::default();
        config.pushover.token = "t".to_string();
        let status = channel_status(&config);
        assert_eq!(status, vec![("sendgrid", false), ("pushover", true), ("webhook", false)]);
    }
}
