use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::errors::LlmError;
use crate::models::AiProvider;
use crate::services::ai_bridge::{BridgeSlot, KeylessProxyProvider};
use crate::services::prompt_service::PromptPair;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GROK_URL: &str = "https://api.x.ai/v1/chat/completions";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Configuration for the AI providers
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub chatgpt_model: String,
    pub grok_model: String,
    pub gemini_model: String,
    pub max_tokens: usize,
    /// `None` leaves requests without a client-side timeout.
    pub request_timeout: Option<Duration>,
    pub bridge_wait: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            chatgpt_model: "gpt-4o-mini".to_string(),
            grok_model: "grok-beta".to_string(),
            gemini_model: "gemini-pro".to_string(),
            max_tokens: 800,
            request_timeout: None,
            bridge_wait: Duration::from_secs(30),
        }
    }
}

/// One external chat service. Returns the raw response body; interpretation
/// is left to the response normalizer.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Resolves once the provider can take a request. Most are always ready.
    async fn ready(&self) -> Result<(), LlmError> {
        Ok(())
    }

    async fn dispatch(&self, credential: &str, prompt: &PromptPair) -> Result<String, LlmError>;
}

fn build_client(timeout: Option<Duration>) -> Result<Client, LlmError> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| LlmError::Network(format!("failed to create HTTP client: {}", e)))
}

/// Pulls `error.message` (or a bare `error` string) out of a provider error body.
pub fn upstream_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .map(String::from)
}

async fn send(provider: &str, request: reqwest::RequestBuilder) -> Result<String, LlmError> {
    let response = request
        .send()
        .await
        .map_err(|e| LlmError::Network(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| LlmError::Network(e.to_string()))?;

    if !status.is_success() {
        error!("{} API call failed with HTTP {}", provider, status);
        return Err(LlmError::Api {
            status: status.as_u16(),
            message: upstream_error_message(&body),
        });
    }

    info!("{} responded ({} bytes)", provider, body.len());
    Ok(body)
}

/// Chat completion request/response structures shared by OpenAI and xAI
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Bearer-authenticated `/chat/completions` endpoint with role-tagged messages.
pub struct ChatCompletionsProvider {
    name: &'static str,
    url: &'static str,
    model: String,
    max_tokens: usize,
    temperature: f32,
    client: Client,
}

impl ChatCompletionsProvider {
    pub fn chatgpt(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            name: "ChatGPT",
            url: OPENAI_URL,
            model: config.chatgpt_model.clone(),
            max_tokens: config.max_tokens,
            temperature: 0.5,
            client: build_client(config.request_timeout)?,
        })
    }

    pub fn grok(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            name: "Grok",
            url: GROK_URL,
            model: config.grok_model.clone(),
            max_tokens: config.max_tokens,
            temperature: 0.7,
            client: build_client(config.request_timeout)?,
        })
    }
}

#[async_trait]
impl ChatProvider for ChatCompletionsProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn dispatch(&self, credential: &str, prompt: &PromptPair) -> Result<String, LlmError> {
        info!("Calling {} (model: {}, max_tokens: {})", self.name, self.model, self.max_tokens);

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        send(
            self.name,
            self.client
                .post(self.url)
                .bearer_auth(credential)
                .json(&request),
        )
        .await
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

/// Google Gemini: single content blob, key passed as a query parameter.
pub struct GeminiProvider {
    model: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            model: config.gemini_model.clone(),
            client: build_client(config.request_timeout)?,
        })
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn dispatch(&self, credential: &str, prompt: &PromptPair) -> Result<String, LlmError> {
        info!("Calling Gemini (model: {})", self.model);

        let full_prompt = prompt.combined();
        let request = GenerateContentRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: &full_prompt }],
            }],
        };
        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, self.model);

        send(
            "Gemini",
            self.client
                .post(url)
                .query(&[("key", credential)])
                .json(&request),
        )
        .await
    }
}

/// Routes a request to the provider for the selected `AiProvider` variant.
/// No retries: a failed call is returned as-is.
pub struct ProviderDispatcher {
    chatgpt: Arc<dyn ChatProvider>,
    gemini: Arc<dyn ChatProvider>,
    grok: Arc<dyn ChatProvider>,
    keyless: Arc<dyn ChatProvider>,
}

impl ProviderDispatcher {
    pub fn new(
        chatgpt: Arc<dyn ChatProvider>,
        gemini: Arc<dyn ChatProvider>,
        grok: Arc<dyn ChatProvider>,
        keyless: Arc<dyn ChatProvider>,
    ) -> Self {
        Self {
            chatgpt,
            gemini,
            grok,
            keyless,
        }
    }

    pub fn from_config(config: &LlmConfig, bridge: Arc<BridgeSlot>) -> Result<Self, LlmError> {
        info!("Initializing AI providers (ChatGPT, Gemini, Grok, keyless bridge)");
        Ok(Self::new(
            Arc::new(ChatCompletionsProvider::chatgpt(config)?),
            Arc::new(GeminiProvider::new(config)?),
            Arc::new(ChatCompletionsProvider::grok(config)?),
            Arc::new(KeylessProxyProvider::new(bridge, config.bridge_wait)),
        ))
    }

    fn provider_for(&self, provider: AiProvider) -> &Arc<dyn ChatProvider> {
        match provider {
            AiProvider::ChatGpt => &self.chatgpt,
            AiProvider::Gemini => &self.gemini,
            AiProvider::Grok => &self.grok,
            AiProvider::KeylessProxy => &self.keyless,
        }
    }

    fn check_credential(provider: AiProvider, credential: &str) -> Result<(), LlmError> {
        if provider.requires_credential() && credential.trim().is_empty() {
            return Err(LlmError::MissingCredential(provider.display_name()));
        }
        Ok(())
    }

    /// Configuration checks that need no prompt: credential presence and
    /// provider readiness (the keyless bridge wait).
    pub async fn prepare(&self, provider: AiProvider, credential: &str) -> Result<(), LlmError> {
        Self::check_credential(provider, credential)?;
        self.provider_for(provider).ready().await
    }

    pub async fn dispatch(
        &self,
        provider: AiProvider,
        credential: &str,
        prompt: &PromptPair,
    ) -> Result<String, LlmError> {
        Self::check_credential(provider, credential)?;

        let target = self.provider_for(provider);
        info!("Dispatching analysis prompt to {}", target.name());
        target.dispatch(credential.trim(), prompt).await
    }
}
