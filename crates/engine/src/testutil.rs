//! Shared test doubles for the engine's capability seams.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use slotwatch_browser::{Bridge, Locator, PageAction};
use slotwatch_core::{Config, Error, Result};
use slotwatch_notify::Notifier;

use crate::claim::{FormPoster, SUCCESS_MARKER};

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.account.email = "user@example.com".to_string();
    config.account.password = "hunter2".to_string();
    config.account.schedule_id = "60627961".to_string();
    config.portal.embassy = "en-am".to_string();
    config.portal.facility_id = "122".to_string();
    config.window.start = "2025-02-01".parse().ok();
    config.window.end = "2025-02-28".parse().ok();
    config.timing.retry_lower_secs = 1;
    config.timing.retry_upper_secs = 3;
    config
}

pub fn dates_body(dates: &[&str]) -> String {
    let entries: Vec<String> = dates
        .iter()
        .map(|d| format!(r#"{{"date":"{}","business_day":true}}"#, d))
        .collect();
    format!("[{}]", entries.join(","))
}

pub fn times_body(times: &[&str]) -> String {
    let entries: Vec<String> = times.iter().map(|t| format!(r#""{}""#, t)).collect();
    format!(r#"{{"available_times":[{}]}}"#, entries.join(","))
}

/// Scripted browser double. Element probes pop from `exists_queue`
/// (defaulting to present when the queue is empty); script executions pop
/// from `script_results` (defaulting to an empty body).
pub struct MockBridge {
    pub navigations: Mutex<Vec<String>>,
    pub applied: Mutex<Vec<(Locator, PageAction)>>,
    pub exists_queue: Mutex<VecDeque<bool>>,
    pub script_results: Mutex<VecDeque<String>>,
    pub cookie: Mutex<Option<String>>,
    pub values: Mutex<HashMap<String, String>>,
    pub closed: AtomicBool,
}

impl MockBridge {
    pub fn new() -> Self {
        let mut values = HashMap::new();
        values.insert("authenticity_token".to_string(), "tok123".to_string());
        values.insert("confirmed_limit_message".to_string(), "1".to_string());
        values.insert(
            "use_consulate_appointment_capacity".to_string(),
            "true".to_string(),
        );
        Self {
            navigations: Mutex::new(Vec::new()),
            applied: Mutex::new(Vec::new()),
            exists_queue: Mutex::new(VecDeque::new()),
            script_results: Mutex::new(VecDeque::new()),
            cookie: Mutex::new(Some("cookie-abc".to_string())),
            values: Mutex::new(values),
            closed: AtomicBool::new(false),
        }
    }

    pub fn push_exists(&self, present: bool) {
        self.exists_queue.lock().unwrap().push_back(present);
    }

    pub fn push_script_result(&self, body: String) {
        self.script_results.lock().unwrap().push_back(body);
    }
}

#[async_trait]
impl Bridge for MockBridge {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.navigations.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn apply(&self, locator: &Locator, action: &PageAction) -> Result<()> {
        self.applied
            .lock()
            .unwrap()
            .push((locator.clone(), action.clone()));
        Ok(())
    }

    async fn exists(&self, _locator: &Locator) -> bool {
        self.exists_queue.lock().unwrap().pop_front().unwrap_or(true)
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        if self.exists(locator).await {
            Ok(())
        } else {
            Err(Error::Browser(format!(
                "timed out after {:?} waiting for {:?}",
                timeout, locator
            )))
        }
    }

    async fn read_value(&self, locator: &Locator) -> Result<String> {
        let name = match locator {
            Locator::Name(name) => name.clone(),
            other => return Err(Error::Browser(format!("no value for {:?}", other))),
        };
        self.values
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .ok_or_else(|| Error::Browser(format!("element not found: {}", name)))
    }

    async fn execute_script(&self, _body: &str) -> Result<String> {
        Ok(self
            .script_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn get_cookie(&self, _name: &str) -> Result<Option<String>> {
        Ok(self.cookie.lock().unwrap().clone())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub struct MockPoster {
    pub response: String,
    pub calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl MockPoster {
    pub fn success() -> Self {
        Self::with_response(&format!("<html>{} for you</html>", SUCCESS_MARKER))
    }

    pub fn with_response(body: &str) -> Self {
        Self {
            response: body.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl FormPoster for MockPoster {
    async fn post_form(
        &self,
        url: &str,
        _headers: &[(String, String)],
        form: &[(String, String)],
        _cookie: (&str, &str),
    ) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), form.to_vec()));
        Ok(self.response.clone())
    }
}

#[derive(Default)]
pub struct MockNotifier {
    pub events: Mutex<Vec<(String, String)>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_title(&self, title: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == title)
            .count()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, title: &str, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}
