//! Low-level Chrome DevTools Protocol (CDP) client over WebSocket.
//!
//! Connects to a page target's debugging WebSocket and exposes the handful
//! of commands the engine drives a portal page with: navigation, script
//! evaluation and cookie access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use slotwatch_core::{Error, Result};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, warn};

const COMMAND_TIMEOUT_SECS: u64 = 30;

pub struct CdpClient {
    /// Sender to write messages to the WebSocket.
    ws_tx: mpsc::Sender<String>,
    /// Pending command responses, keyed by request ID.
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>,
    /// Auto-incrementing command ID.
    next_id: AtomicU64,
    _reader_handle: tokio::task::JoinHandle<()>,
    _writer_handle: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to a page target's CDP WebSocket endpoint.
    pub async fn connect(ws_url: &str) -> Result<Self> {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::connect_async;
        use tokio_tungstenite::tungstenite::Message;

        let (ws_stream, _) = connect_async(ws_url).await.map_err(|e| {
            Error::Browser(format!("Failed to connect to CDP endpoint {}: {}", ws_url, e))
        })?;

        let (mut ws_sink, mut ws_stream_read) = ws_stream.split();

        let (ws_tx, mut ws_rx) = mpsc::channel::<String>(64);

        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let pending_clone = pending.clone();

        // Writer task: owns the sink, forwards messages from the channel
        let writer_handle = tokio::spawn(async move {
            while let Some(msg) = ws_rx.recv().await {
                if let Err(e) = ws_sink.send(Message::Text(msg)).await {
                    error!("CDP WebSocket write error: {}", e);
                    break;
                }
            }
        });

        // Reader task: dispatches command responses to their waiters
        let reader_handle = tokio::spawn(async move {
            while let Some(msg_result) = ws_stream_read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        if let Ok(val) = serde_json::from_str::<Value>(&text) {
                            if let Some(id) = val.get("id").and_then(|v| v.as_u64()) {
                                let mut pending = pending_clone.lock().await;
                                if let Some(tx) = pending.remove(&id) {
                                    let _ = tx.send(val);
                                }
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        debug!("CDP WebSocket closed by server");
                        break;
                    }
                    Err(e) => {
                        warn!("CDP WebSocket read error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
        });

        Ok(Self {
            ws_tx,
            pending,
            next_id: AtomicU64::new(1),
            _reader_handle: reader_handle,
            _writer_handle: writer_handle,
        })
    }

    /// Send a CDP command and wait for the response.
    pub async fn send_command(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let msg = json!({
            "id": id,
            "method": method,
            "params": params,
        });

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        self.ws_tx
            .send(msg.to_string())
            .await
            .map_err(|e| Error::Browser(format!("Failed to send CDP command: {}", e)))?;

        let timeout =
            tokio::time::timeout(std::time::Duration::from_secs(COMMAND_TIMEOUT_SECS), rx);
        match timeout.await {
            Ok(Ok(response)) => {
                if let Some(error) = response.get("error") {
                    Err(Error::Browser(format!("CDP error: {}", error)))
                } else {
                    Ok(response.get("result").cloned().unwrap_or(Value::Null))
                }
            }
            Ok(Err(_)) => Err(Error::Browser("CDP response channel closed".to_string())),
            Err(_) => {
                let mut pending = self.pending.lock().await;
                pending.remove(&id);
                Err(Error::Browser(format!(
                    "CDP command '{}' timed out after {}s",
                    method, COMMAND_TIMEOUT_SECS
                )))
            }
        }
    }

    /// Enable a CDP domain (e.g., "Page", "Runtime", "Network").
    pub async fn enable_domain(&self, domain: &str) -> Result<()> {
        self.send_command(&format!("{}.enable", domain), json!({}))
            .await?;
        Ok(())
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.send_command("Page.navigate", json!({"url": url}))
            .await?;
        Ok(())
    }

    /// Evaluate a JS expression in the page context, returning its value.
    /// A thrown exception surfaces as an error.
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        let result = self
            .send_command(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;
        if let Some(details) = result.get("exceptionDetails") {
            let text = details
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown page exception");
            return Err(Error::Browser(format!("Script threw: {}", text)));
        }
        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// All cookies visible to the page.
    pub async fn get_cookies(&self) -> Result<Vec<Value>> {
        let result = self.send_command("Network.getCookies", json!({})).await?;
        Ok(result
            .get("cookies")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }

    /// Ask the browser to shut down. Best effort.
    pub async fn close_browser(&self) {
        if let Err(e) = self.send_command("Browser.close", json!({})).await {
            debug!("CDP Browser.close failed (may already be closed): {}", e);
        }
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self._reader_handle.abort();
        self._writer_handle.abort();
    }
}
