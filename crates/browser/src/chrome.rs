//! Chrome lifecycle: launch a local instance or attach to a remote
//! debugging endpoint, then drive the page target through [`CdpClient`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use slotwatch_core::config::BrowserConfig;
use slotwatch_core::{Error, Result};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::bridge::{Bridge, Locator, PageAction};
use crate::cdp::CdpClient;

const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A [`Bridge`] backed by a CDP connection to a Chrome page target.
pub struct CdpBridge {
    cdp: CdpClient,
    /// Present only when we launched the browser ourselves.
    process: Mutex<Option<Child>>,
}

impl CdpBridge {
    /// Launch a local Chrome with its own profile directory, or attach to
    /// the configured remote debugging endpoint.
    pub async fn start(config: &BrowserConfig, data_dir: &Path) -> Result<Self> {
        if config.local {
            Self::launch(data_dir, config.headed).await
        } else {
            Self::attach(&config.remote_debug_url).await
        }
    }

    async fn launch(data_dir: &Path, headed: bool) -> Result<Self> {
        let binary = find_chrome_binary()
            .ok_or_else(|| Error::Browser("Chrome not found. Please install it.".into()))?;

        std::fs::create_dir_all(data_dir)?;
        let debug_port = find_free_port().await?;
        let args = build_chrome_args(debug_port, data_dir, headed);

        info!(port = debug_port, headed = headed, "Launching Chrome");

        let child = Command::new(&binary)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Browser(format!("Failed to launch Chrome: {}", e)))?;

        let endpoint = format!("http://127.0.0.1:{}", debug_port);
        wait_for_cdp_ready(&endpoint, 15).await?;
        let page_ws_url = get_page_ws_url(&endpoint).await?;
        let cdp = Self::connect(&page_ws_url).await?;

        Ok(Self {
            cdp,
            process: Mutex::new(Some(child)),
        })
    }

    async fn attach(endpoint: &str) -> Result<Self> {
        // A ws:// URL is taken as a page target directly; an http:// URL
        // goes through /json/list discovery.
        let page_ws_url = if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
            endpoint.to_string()
        } else {
            get_page_ws_url(endpoint.trim_end_matches('/')).await?
        };
        info!(ws_url = %page_ws_url, "Attaching to remote browser");
        let cdp = Self::connect(&page_ws_url).await?;
        Ok(Self {
            cdp,
            process: Mutex::new(None),
        })
    }

    async fn connect(page_ws_url: &str) -> Result<CdpClient> {
        let cdp = CdpClient::connect(page_ws_url).await?;
        cdp.enable_domain("Page").await?;
        cdp.enable_domain("Runtime").await?;
        cdp.enable_domain("Network").await?;
        debug!(ws_url = %page_ws_url, "CDP connection established");
        Ok(cdp)
    }

    async fn eval_string(&self, expression: &str) -> Result<String> {
        let value = self.cdp.evaluate(expression).await?;
        Ok(match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }
}

#[async_trait]
impl Bridge for CdpBridge {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.cdp.navigate(url).await
    }

    async fn apply(&self, locator: &Locator, action: &PageAction) -> Result<()> {
        let act = match action {
            PageAction::Click => "el.click();".to_string(),
            PageAction::SendText(text) => format!(
                "el.value = {}; \
                 el.dispatchEvent(new Event('input', {{bubbles: true}})); \
                 el.dispatchEvent(new Event('change', {{bubbles: true}}));",
                Value::from(text.as_str())
            ),
        };
        let script = format!(
            "(function() {{ var el = {}; if (!el) return 'missing'; {} return 'ok'; }})()",
            locator.js_lookup(),
            act
        );
        match self.eval_string(&script).await?.as_str() {
            "ok" => Ok(()),
            _ => Err(Error::Browser(format!("element not found: {:?}", locator))),
        }
    }

    async fn exists(&self, locator: &Locator) -> bool {
        let script = format!("!!({})", locator.js_lookup());
        matches!(self.cdp.evaluate(&script).await, Ok(Value::Bool(true)))
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.exists(locator).await {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Browser(format!(
                    "timed out after {:?} waiting for {:?}",
                    timeout, locator
                )));
            }
            tokio::time::sleep(ELEMENT_POLL_INTERVAL).await;
        }
    }

    async fn read_value(&self, locator: &Locator) -> Result<String> {
        let script = format!(
            "(function() {{ var el = {}; return el ? String(el.value) : null; }})()",
            locator.js_lookup()
        );
        let value = self.cdp.evaluate(&script).await?;
        match value {
            Value::String(s) => Ok(s),
            _ => Err(Error::Browser(format!("element not found: {:?}", locator))),
        }
    }

    async fn execute_script(&self, body: &str) -> Result<String> {
        self.eval_string(&format!("(function() {{ {} }})()", body))
            .await
    }

    async fn get_cookie(&self, name: &str) -> Result<Option<String>> {
        let cookies = self.cdp.get_cookies().await?;
        Ok(cookies.iter().find_map(|c| {
            if c.get("name").and_then(|v| v.as_str()) == Some(name) {
                c.get("value").and_then(|v| v.as_str()).map(String::from)
            } else {
                None
            }
        }))
    }

    async fn close(&self) {
        self.cdp.close_browser().await;
        let mut guard = self.process.lock().await;
        if let Some(mut child) = guard.take() {
            let _ = child.kill().await;
        }
    }
}

fn build_chrome_args(debug_port: u16, user_data_dir: &Path, headed: bool) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={}", debug_port),
        format!("--user-data-dir={}", user_data_dir.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-background-networking".to_string(),
        "--disable-extensions".to_string(),
        "--disable-sync".to_string(),
        "--password-store=basic".to_string(),
    ];
    if !headed {
        args.push("--headless=new".to_string());
    }
    args.push("--window-size=1280,720".to_string());
    args.push("about:blank".to_string());
    args
}

/// Find a Chrome/Chromium binary on the system.
pub fn find_chrome_binary() -> Option<String> {
    let candidates = if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ]
    } else if cfg!(target_os = "linux") {
        vec![
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
        ]
    } else {
        vec![
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ]
    };

    for candidate in candidates {
        if PathBuf::from(candidate).exists() {
            return Some(candidate.to_string());
        }
        if !candidate.contains('/') && !candidate.contains('\\') && which::which(candidate).is_ok()
        {
            return Some(candidate.to_string());
        }
    }
    None
}

async fn find_free_port() -> Result<u16> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| Error::Browser(format!("Failed to bind to find free port: {}", e)))?;
    let port = listener
        .local_addr()
        .map_err(|e| Error::Browser(format!("Failed to get local addr: {}", e)))?
        .port();
    drop(listener);
    Ok(port)
}

/// Poll the /json/version endpoint until the debugger answers.
async fn wait_for_cdp_ready(endpoint: &str, timeout_secs: u64) -> Result<()> {
    let start = std::time::Instant::now();
    let timeout = Duration::from_secs(timeout_secs);
    let url = format!("{}/json/version", endpoint);

    loop {
        if start.elapsed() > timeout {
            return Err(Error::Browser(format!(
                "Chrome CDP not ready after {}s at {}",
                timeout_secs, endpoint
            )));
        }
        if let Ok(resp) = reqwest::get(&url).await {
            if resp.status().is_success() {
                return Ok(());
            }
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

/// Discover the first page target's WebSocket URL via /json/list. Retries
/// a few times since the page target may not appear immediately.
async fn get_page_ws_url(endpoint: &str) -> Result<String> {
    let url = format!("{}/json/list", endpoint);

    for attempt in 0..10 {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }

        let resp = match reqwest::get(&url).await {
            Ok(r) => r,
            Err(_) => continue,
        };
        let targets: Vec<Value> = match resp.json().await {
            Ok(t) => t,
            Err(_) => continue,
        };

        for target in &targets {
            if target.get("type").and_then(|v| v.as_str()) == Some("page") {
                if let Some(ws_url) = target.get("webSocketDebuggerUrl").and_then(|v| v.as_str()) {
                    return Ok(ws_url.to_string());
                }
            }
        }
    }

    Err(Error::Browser(
        "No page target found after retries".to_string(),
    ))
}
