//! The one-shot reschedule transaction.
//!
//! Best-effort and non-transactional: there is no rollback if the portal
//! partially applies the change, and a failed claim is never retried
//! within the same run. Repeated writes against the booking endpoint risk
//! account flags.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use slotwatch_browser::{Bridge, Locator, PageAction};
use slotwatch_core::{ClaimResult, Config, Error, Result};
use tracing::{info, warn};

use crate::fetch::AvailabilityFetcher;
use crate::session::SESSION_COOKIE;

/// The portal reports success only as this substring in the response HTML.
/// There is no structured success code; this classifier is the single
/// fragile coupling point to the portal's response format.
pub const SUCCESS_MARKER: &str = "Successfully Scheduled";

pub fn is_claim_confirmed(body: &str) -> bool {
    body.contains(SUCCESS_MARKER)
}

const CONFIRM_PAGE_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36";

/// Seam for the authenticated form POST, mockable in tests.
#[async_trait]
pub trait FormPoster: Send + Sync {
    async fn post_form(
        &self,
        url: &str,
        headers: &[(String, String)],
        form: &[(String, String)],
        cookie: (&str, &str),
    ) -> Result<String>;
}

pub struct HttpFormPoster {
    client: reqwest::Client,
}

impl HttpFormPoster {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFormPoster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FormPoster for HttpFormPoster {
    async fn post_form(
        &self,
        url: &str,
        headers: &[(String, String)],
        form: &[(String, String)],
        cookie: (&str, &str),
    ) -> Result<String> {
        let mut request = self.client.post(url).form(form);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        request = request.header("Cookie", format!("{}={}", cookie.0, cookie.1));
        let response = request.send().await?;
        Ok(response.text().await?)
    }
}

pub struct RescheduleTransactor {
    bridge: Arc<dyn Bridge>,
    poster: Arc<dyn FormPoster>,
    config: Arc<Config>,
}

impl RescheduleTransactor {
    pub fn new(bridge: Arc<dyn Bridge>, poster: Arc<dyn FormPoster>, config: Arc<Config>) -> Self {
        Self {
            bridge,
            poster,
            config,
        }
    }

    /// Single attempt to convert an open date into a confirmed appointment.
    /// The caller terminates the run after this returns, success or not.
    pub async fn claim(
        &self,
        fetcher: &AvailabilityFetcher,
        date: NaiveDate,
    ) -> Result<ClaimResult> {
        let Some(time) = fetcher.get_time(date).await? else {
            warn!(date = %date, "No time available for matched date");
            return Ok(ClaimResult::Failure {
                date,
                time: String::new(),
                raw_response: "no available time for date".to_string(),
            });
        };

        info!(date = %date, time = %time, "Attempting reschedule");

        // Walk to the confirmation page; the anti-forgery token and the
        // hidden confirmation flags only exist there.
        let url = self.config.appointment_url();
        self.bridge.navigate(&url).await?;
        self.bridge
            .apply(&Locator::name("commit"), &PageAction::Click)
            .await?;
        self.bridge
            .wait_for(
                &Locator::id("appointments_consulate_appointment_date_input"),
                CONFIRM_PAGE_TIMEOUT,
            )
            .await?;

        let token = self
            .bridge
            .read_value(&Locator::name("authenticity_token"))
            .await?;
        let limit_flag = self
            .bridge
            .read_value(&Locator::name("confirmed_limit_message"))
            .await?;
        let capacity_flag = self
            .bridge
            .read_value(&Locator::name("use_consulate_appointment_capacity"))
            .await?;
        let cookie = self
            .bridge
            .get_cookie(SESSION_COOKIE)
            .await?
            .ok_or_else(|| Error::Browser("session cookie missing".into()))?;

        let form = [
            ("authenticity_token".to_string(), token),
            ("confirmed_limit_message".to_string(), limit_flag),
            (
                "use_consulate_appointment_capacity".to_string(),
                capacity_flag,
            ),
            (
                "appointments[consulate_appointment][facility_id]".to_string(),
                self.config.portal.facility_id.clone(),
            ),
            (
                "appointments[consulate_appointment][date]".to_string(),
                date.to_string(),
            ),
            (
                "appointments[consulate_appointment][time]".to_string(),
                time.clone(),
            ),
        ];
        let headers = self.browser_headers();

        let body = self
            .poster
            .post_form(&url, &headers, &form, (SESSION_COOKIE, &cookie))
            .await?;

        if is_claim_confirmed(&body) {
            info!(date = %date, time = %time, "Reschedule confirmed");
            Ok(ClaimResult::Success { date, time })
        } else {
            warn!(date = %date, time = %time, "Reschedule rejected by portal");
            Ok(ClaimResult::Failure {
                date,
                time,
                raw_response: body,
            })
        }
    }

    /// Headers the portal expects from a browser-originated form submit.
    fn browser_headers(&self) -> Vec<(String, String)> {
        vec![
            (
                "Accept".to_string(),
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            ),
            ("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()),
            ("Host".to_string(), self.config.portal.host.clone()),
            (
                "Origin".to_string(),
                format!("https://{}", self.config.portal.host),
            ),
            ("Referer".to_string(), self.config.appointment_url()),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
        ]
    }
}
