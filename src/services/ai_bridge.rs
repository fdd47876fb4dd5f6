use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::LlmError;
use crate::services::llm_service::{upstream_error_message, ChatProvider};
use crate::services::prompt_service::PromptPair;

/// Credential-free AI access supplied from outside the process.
#[async_trait]
pub trait AiBridge: Send + Sync {
    async fn chat(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Slot the bridge is installed into once it becomes available.
pub struct BridgeSlot {
    tx: watch::Sender<Option<Arc<dyn AiBridge>>>,
}

impl BridgeSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn install(&self, bridge: Arc<dyn AiBridge>) {
        self.tx.send_replace(Some(bridge));
        info!("AI bridge is available");
    }

    pub fn is_ready(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Waits up to `timeout` for a bridge. Dropping the future cancels the wait.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<Arc<dyn AiBridge>, LlmError> {
        let current = self.tx.borrow().clone();
        if let Some(bridge) = current {
            return Ok(bridge);
        }

        info!("Waiting up to {:?} for the AI bridge", timeout);
        let mut rx = self.tx.subscribe();
        let ready = async move {
            rx.wait_for(|bridge| bridge.is_some())
                .await
                .ok()
                .and_then(|bridge| bridge.clone())
        };

        match tokio::time::timeout(timeout, ready).await {
            Ok(Some(bridge)) => Ok(bridge),
            _ => {
                warn!("AI bridge did not become available within {:?}", timeout);
                Err(LlmError::BridgeUnavailable(timeout))
            }
        }
    }
}

impl Default for BridgeSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Bridge reachable over HTTP: `POST {base}/chat` with `{"prompt": ...}`.
pub struct HttpBridge {
    client: Client,
    base_url: String,
}

impl HttpBridge {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AiBridge for HttpBridge {
    async fn chat(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self
            .client
            .post(format!("{}/chat", self.base_url))
            .json(&json!({ "prompt": prompt }))
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: upstream_error_message(&body),
            });
        }
        Ok(body)
    }
}

/// Polls `{base}/health` at a fixed interval and installs an `HttpBridge`
/// into `slot` on the first successful response.
pub fn spawn_bridge_probe(slot: Arc<BridgeSlot>, base_url: String, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let client = Client::new();
        let health_url = format!("{}/health", base_url.trim_end_matches('/'));
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;
            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    slot.install(Arc::new(HttpBridge::new(client.clone(), base_url.clone())));
                    return;
                }
                Ok(resp) => debug!("AI bridge not ready yet (HTTP {})", resp.status()),
                Err(e) => debug!("AI bridge not reachable yet: {}", e),
            }
        }
    })
}

/// The keyless variant: no credential, waits for the bridge, sends one prompt blob.
pub struct KeylessProxyProvider {
    slot: Arc<BridgeSlot>,
    wait: Duration,
}

impl KeylessProxyProvider {
    pub fn new(slot: Arc<BridgeSlot>, wait: Duration) -> Self {
        Self { slot, wait }
    }
}

#[async_trait]
impl ChatProvider for KeylessProxyProvider {
    fn name(&self) -> &'static str {
        "Keyless AI"
    }

    async fn ready(&self) -> Result<(), LlmError> {
        self.slot.wait_ready(self.wait).await.map(|_| ())
    }

    async fn dispatch(&self, _credential: &str, prompt: &PromptPair) -> Result<String, LlmError> {
        let bridge = self.slot.wait_ready(self.wait).await?;
        bridge.chat(&prompt.combined()).await
    }
}
