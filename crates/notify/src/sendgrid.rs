use serde_json::json;
use slotwatch_core::config::SendgridConfig;
use slotwatch_core::{Error, Result};

const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Mails the account owner at their own address, the way the portal
/// account is already reachable.
pub async fn send(
    client: &reqwest::Client,
    config: &SendgridConfig,
    title: &str,
    message: &str,
) -> Result<()> {
    let payload = json!({
        "personalizations": [{"to": [{"email": config.email}]}],
        "from": {"email": config.email},
        "subject": title,
        "content": [{"type": "text/plain", "value": message}],
    });

    let response = client
        .post(SENDGRID_API_URL)
        .bearer_auth(&config.api_key)
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Notify(format!("SendGrid error {}: {}", status, body)));
    }
    Ok(())
}
