use slotwatch_core::config::WebhookConfig;
use slotwatch_core::{Error, Result};

/// Personal push endpoint: a plain form POST to a user-operated site.
pub async fn send(
    client: &reqwest::Client,
    config: &WebhookConfig,
    title: &str,
    message: &str,
) -> Result<()> {
    let response = client
        .post(&config.url)
        .form(&[
            ("title", format!("SLOT - {}", title)),
            ("user", config.user.clone()),
            ("pass", config.pass.clone()),
            ("email", config.target_email.clone()),
            ("msg", message.to_string()),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Notify(format!("Webhook error {}: {}", status, body)));
    }
    Ok(())
}
