use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::paths::Paths;
use crate::types::TargetWindow;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccountConfig {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Found in the re-schedule page link:
    /// `https://<host>/<embassy>/niv/schedule/{SCHEDULE_ID}/appointment`
    #[serde(default)]
    pub schedule_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalConfig {
    #[serde(default = "default_portal_host")]
    pub host: String,
    /// Embassy locale segment of the portal URL, e.g. "en-am".
    #[serde(default)]
    pub embassy: String,
    #[serde(default)]
    pub facility_id: String,
    /// Text of the post-login continue link, used as the liveness landmark.
    #[serde(default = "default_landmark_text")]
    pub landmark_text: String,
}

fn default_portal_host() -> String {
    "ais.usvisa-info.com".to_string()
}

fn default_landmark_text() -> String {
    "Continue".to_string()
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            host: default_portal_host(),
            embassy: String::new(),
            facility_id: String::new(),
            landmark_text: default_landmark_text(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WindowConfig {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingConfig {
    /// Lower bound of the jittered wait between availability checks.
    #[serde(default = "default_retry_lower_secs")]
    pub retry_lower_secs: u64,
    /// Upper bound of the jittered wait between availability checks.
    #[serde(default = "default_retry_upper_secs")]
    pub retry_upper_secs: u64,
    /// Continuous work before taking a rest break.
    #[serde(default = "default_work_limit_hours")]
    pub work_limit_hours: f64,
    #[serde(default = "default_work_cooldown_hours")]
    pub work_cooldown_hours: f64,
    /// Sleep after a suspected temporary ban (empty dates feed).
    #[serde(default = "default_ban_cooldown_hours")]
    pub ban_cooldown_hours: f64,
    /// Pause between individual form interactions during login.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
}

fn default_retry_lower_secs() -> u64 {
    120
}

fn default_retry_upper_secs() -> u64 {
    300
}

fn default_work_limit_hours() -> f64 {
    1.5
}

fn default_work_cooldown_hours() -> f64 {
    5.0
}

fn default_ban_cooldown_hours() -> f64 {
    12.0
}

fn default_step_delay_ms() -> u64 {
    500
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            retry_lower_secs: default_retry_lower_secs(),
            retry_upper_secs: default_retry_upper_secs(),
            work_limit_hours: default_work_limit_hours(),
            work_cooldown_hours: default_work_cooldown_hours(),
            ban_cooldown_hours: default_ban_cooldown_hours(),
            step_delay_ms: default_step_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfig {
    /// Launch a local Chrome when true, otherwise attach to
    /// `remote_debug_url`.
    #[serde(default = "default_browser_local")]
    pub local: bool,
    #[serde(default = "default_remote_debug_url")]
    pub remote_debug_url: String,
    #[serde(default)]
    pub headed: bool,
}

fn default_browser_local() -> bool {
    true
}

fn default_remote_debug_url() -> String {
    "http://127.0.0.1:9222".to_string()
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            local: default_browser_local(),
            remote_debug_url: default_remote_debug_url(),
            headed: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SendgridConfig {
    #[serde(default)]
    pub api_key: String,
    /// Used as both sender and recipient.
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PushoverConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub user: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
    #[serde(default)]
    pub target_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NotifyConfig {
    #[serde(default)]
    pub sendgrid: SendgridConfig,
    #[serde(default)]
    pub pushover: PushoverConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Checks the fields the engine cannot run without.
    pub fn validate(&self) -> Result<()> {
        if self.account.email.is_empty() || self.account.password.is_empty() {
            return Err(Error::Config("account email/password not set".into()));
        }
        if self.account.schedule_id.is_empty() {
            return Err(Error::Config("account scheduleId not set".into()));
        }
        if self.portal.embassy.is_empty() || self.portal.facility_id.is_empty() {
            return Err(Error::Config("portal embassy/facilityId not set".into()));
        }
        if self.timing.retry_lower_secs > self.timing.retry_upper_secs {
            return Err(Error::Config(
                "timing retryLowerSecs exceeds retryUpperSecs".into(),
            ));
        }
        self.target_window()?;
        Ok(())
    }

    pub fn target_window(&self) -> Result<TargetWindow> {
        let (start, end) = match (self.window.start, self.window.end) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(Error::Config("window start/end not set".into())),
        };
        if end < start {
            return Err(Error::Config("window end precedes window start".into()));
        }
        Ok(TargetWindow { start, end })
    }

    fn origin(&self) -> String {
        format!("https://{}", self.portal.host)
    }

    pub fn sign_in_url(&self) -> String {
        format!("{}/{}/niv/users/sign_in", self.origin(), self.portal.embassy)
    }

    pub fn sign_out_url(&self) -> String {
        format!("{}/{}/niv/users/sign_out", self.origin(), self.portal.embassy)
    }

    pub fn appointment_url(&self) -> String {
        format!(
            "{}/{}/niv/schedule/{}/appointment",
            self.origin(),
            self.portal.embassy,
            self.account.schedule_id
        )
    }

    pub fn dates_url(&self) -> String {
        format!(
            "{}/days/{}.json?appointments[expedite]=false",
            self.appointment_url(),
            self.portal.facility_id
        )
    }

    pub fn times_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/times/{}.json?date={}&appointments[expedite]=false",
            self.appointment_url(),
            self.portal.facility_id,
            date
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        let mut config = Config::default();
        config.account.email = "user@example.com".to_string();
        config.account.password = "hunter2".to_string();
        config.account.schedule_id = "60627961".to_string();
        config.portal.embassy = "en-am".to_string();
        config.portal.facility_id = "122".to_string();
        config.window.start = "2025-02-01".parse().ok();
        config.window.end = "2025-02-28".parse().ok();
        config
    }

    #[test]
    fn url_derivation_matches_portal_layout() {
        let config = sample();
        assert_eq!(
            config.sign_in_url(),
            "https://ais.usvisa-info.com/en-am/niv/users/sign_in"
        );
        assert_eq!(
            config.appointment_url(),
            "https://ais.usvisa-info.com/en-am/niv/schedule/60627961/appointment"
        );
        assert_eq!(
            config.dates_url(),
            "https://ais.usvisa-info.com/en-am/niv/schedule/60627961/appointment/days/122.json?appointments[expedite]=false"
        );
        let date: NaiveDate = "2025-02-10".parse().unwrap();
        assert_eq!(
            config.times_url(date),
            "https://ais.usvisa-info.com/en-am/niv/schedule/60627961/appointment/times/122.json?date=2025-02-10&appointments[expedite]=false"
        );
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_window() {
        let mut config = sample();
        config.window.end = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_reversed_window() {
        let mut config = sample();
        config.window.start = "2025-03-01".parse().ok();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_reversed_retry_bounds() {
        let mut config = sample();
        config.timing.retry_lower_secs = 600;
        config.timing.retry_upper_secs = 120;
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = sample();
        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.account.email, config.account.email);
        assert_eq!(loaded.window.start, config.window.start);
        assert_eq!(loaded.timing.retry_lower_secs, config.timing.retry_lower_secs);
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.portal.host, "ais.usvisa-info.com");
        assert_eq!(config.timing.step_delay_ms, 500);
        assert!(config.browser.local);
    }
}
