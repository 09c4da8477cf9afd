use slotwatch_core::config::PushoverConfig;
use slotwatch_core::{Error, Result};

const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

pub async fn send(
    client: &reqwest::Client,
    config: &PushoverConfig,
    title: &str,
    message: &str,
) -> Result<()> {
    let response = client
        .post(PUSHOVER_API_URL)
        .form(&[
            ("token", config.token.as_str()),
            ("user", config.user.as_str()),
            ("title", title),
            ("message", message),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Notify(format!("Pushover error {}: {}", status, body)));
    }
    Ok(())
}
