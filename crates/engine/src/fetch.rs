//! Availability reads against the portal's dates/times endpoints.
//!
//! Requests run as synchronous XHRs inside the live page so they ride the
//! browser's own TLS fingerprint and session, the same way a user's tab
//! would issue them. Empty or malformed payloads degrade to `None`; they
//! are a no-data cycle, not an error.

use std::sync::Arc;

use chrono::NaiveDate;
use slotwatch_browser::Bridge;
use slotwatch_core::{AvailableDate, Config, Result};
use tracing::{debug, warn};

use crate::session::SESSION_COOKIE;

pub struct AvailabilityFetcher {
    bridge: Arc<dyn Bridge>,
    config: Arc<Config>,
}

impl AvailabilityFetcher {
    pub fn new(bridge: Arc<dyn Bridge>, config: Arc<Config>) -> Self {
        Self { bridge, config }
    }

    /// The portal's full list of open dates, in portal order. `None` when
    /// the response is empty or undecodable (the ban-suspicion signal is
    /// an empty result, judged by the caller).
    pub async fn get_dates(&self) -> Result<Option<Vec<AvailableDate>>> {
        let cookie = self.cookie().await?;
        let script = xhr_script(&self.config.dates_url(), &cookie);
        let body = self.bridge.execute_script(&script).await?;
        Ok(parse_dates(&body))
    }

    /// The chosen time-of-day for a date, or `None` when the portal offers
    /// none (or the payload is undecodable).
    pub async fn get_time(&self, date: NaiveDate) -> Result<Option<String>> {
        let cookie = self.cookie().await?;
        let script = xhr_script(&self.config.times_url(date), &cookie);
        let body = self.bridge.execute_script(&script).await?;
        let time = parse_last_time(&body);
        if let Some(time) = &time {
            debug!(date = %date, time = %time, "Resolved appointment time");
        }
        Ok(time)
    }

    async fn cookie(&self) -> Result<String> {
        self.bridge
            .get_cookie(SESSION_COOKIE)
            .await?
            .ok_or_else(|| slotwatch_core::Error::Browser("session cookie missing".into()))
    }
}

/// Script body for an authenticated in-page GET returning the raw body.
fn xhr_script(url: &str, session_cookie: &str) -> String {
    format!(
        "var req = new XMLHttpRequest();\
         req.open('GET', '{url}', false);\
         req.setRequestHeader('Accept', 'application/json, text/javascript, */*; q=0.01');\
         req.setRequestHeader('X-Requested-With', 'XMLHttpRequest');\
         req.setRequestHeader('Cookie', '{cookie_name}={cookie}');\
         req.send(null);\
         return req.responseText;",
        url = url,
        cookie_name = SESSION_COOKIE,
        cookie = session_cookie,
    )
}

fn parse_dates(body: &str) -> Option<Vec<AvailableDate>> {
    if body.trim().is_empty() {
        debug!("Dates response is empty");
        return None;
    }
    match serde_json::from_str::<Vec<AvailableDate>>(body) {
        Ok(dates) => Some(dates),
        Err(e) => {
            warn!(error = %e, "Dates payload did not decode, treating as no data");
            None
        }
    }
}

/// Keeps the last entry of `available_times`. The portal lists times
/// ascending, so this picks the latest slot of the day. Preserved from the
/// original behavior even though an earlier slot may look preferable.
fn parse_last_time(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        debug!("Times response is empty");
        return None;
    }
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Times payload did not decode, treating as no data");
            return None;
        }
    };
    value
        .get("available_times")
        .and_then(|v| v.as_array())
        .and_then(|times| times.last())
        .and_then(|v| v.as_str())
        .map(String::from)
}
