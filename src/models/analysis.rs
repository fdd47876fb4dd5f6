use serde::{Deserialize, Serialize};

use crate::errors::LlmError;

pub const DEFAULT_LANGUAGE: &str = "English";
pub const EMPTY_PORTFOLIO_MESSAGE: &str = "No stocks in portfolio. Add some to analyze!";

/// AI services a user can pick for the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AiProvider {
    #[default]
    #[serde(rename = "chatgpt")]
    ChatGpt,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "grok")]
    Grok,
    #[serde(rename = "keyless-proxy")]
    KeylessProxy,
}

impl AiProvider {
    pub fn id(&self) -> &'static str {
        match self {
            AiProvider::ChatGpt => "chatgpt",
            AiProvider::Gemini => "gemini",
            AiProvider::Grok => "grok",
            AiProvider::KeylessProxy => "keyless-proxy",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AiProvider::ChatGpt => "ChatGPT",
            AiProvider::Gemini => "Gemini",
            AiProvider::Grok => "Grok",
            AiProvider::KeylessProxy => "Keyless AI",
        }
    }

    pub fn requires_credential(&self) -> bool {
        !matches!(self, AiProvider::KeylessProxy)
    }
}

impl std::str::FromStr for AiProvider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chatgpt" => Ok(AiProvider::ChatGpt),
            "gemini" => Ok(AiProvider::Gemini),
            "grok" => Ok(AiProvider::Grok),
            "keyless-proxy" => Ok(AiProvider::KeylessProxy),
            _ => Err(LlmError::UnsupportedProvider(s.to_string())),
        }
    }
}

/// Per-request analysis settings. The credential is never persisted.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub provider: AiProvider,
    pub credential: String,
    pub free_text_context: String,
    pub language: String,
}

impl AnalysisConfig {
    pub fn new(provider: AiProvider) -> Self {
        Self {
            provider,
            credential: String::new(),
            free_text_context: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Body of `POST /api/analysis`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub provider: String,
    #[serde(default)]
    pub credential: Option<String>,
    #[serde(default)]
    pub free_text_context: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl AnalysisRequest {
    pub fn into_config(self) -> Result<AnalysisConfig, LlmError> {
        let provider = self.provider.parse::<AiProvider>()?;
        let language = self
            .language
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        Ok(AnalysisConfig {
            provider,
            credential: self.credential.unwrap_or_default().trim().to_string(),
            free_text_context: self.free_text_context.unwrap_or_default(),
            language,
        })
    }
}

/// Normalised outcome of one analysis. A non-empty `error` overrides `analysis`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis: String,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub error: String,
}

impl AnalysisResult {
    pub fn text(analysis: impl Into<String>) -> Self {
        Self {
            analysis: analysis.into(),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Default::default()
        }
    }

    pub fn empty_portfolio() -> Self {
        Self::text(EMPTY_PORTFOLIO_MESSAGE)
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// What `GET /api/analysis` returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisState {
    pub result: AnalysisResult,
    pub loading: bool,
}
