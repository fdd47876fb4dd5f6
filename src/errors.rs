use std::time::Duration;

use http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Configuration(String),
    #[error("{message}")]
    Upstream { status: u16, message: String },
    #[error("External error: {0}")]
    External(String),
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::External(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            AppError::Storage(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        AppError::Storage(value)
    }
}

impl From<MarketDataError> for AppError {
    fn from(value: MarketDataError) -> Self {
        match value {
            MarketDataError::MissingCredential => {
                AppError::Configuration("Finnhub API key not configured".to_string())
            }
            MarketDataError::InvalidSymbol => {
                AppError::Validation("Missing required parameter: symbol".to_string())
            }
            MarketDataError::Upstream { status, message } => AppError::Upstream { status, message },
            MarketDataError::Network(msg) | MarketDataError::Parse(msg) => AppError::External(msg),
        }
    }
}

/// Failures of the market data gateway.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("market data credential is not configured")]
    MissingCredential,

    #[error("symbol must be a non-empty ticker")]
    InvalidSymbol,

    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Failures while talking to an AI provider.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no credential supplied for {0}")]
    MissingCredential(&'static str),

    #[error("Unsupported AI service: {0}")]
    UnsupportedProvider(String),

    #[error("AI bridge did not become available within {0:?}")]
    BridgeUnavailable(Duration),

    #[error("provider returned HTTP {status}")]
    Api { status: u16, message: Option<String> },

    #[error("network error: {0}")]
    Network(String),
}

pub const GENERIC_ANALYSIS_FAILURE: &str = "Failed to analyze. Check API key/service.";

impl LlmError {
    /// Configuration problems are never retried and map to a static message.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LlmError::MissingCredential(_)
                | LlmError::UnsupportedProvider(_)
                | LlmError::BridgeUnavailable(_)
        )
    }

    /// Text shown to the user in `AnalysisResult::error`.
    pub fn user_message(&self) -> String {
        match self {
            LlmError::MissingCredential(_) => "Please enter your API key.".to_string(),
            LlmError::UnsupportedProvider(id) => format!("Unsupported AI service: {}", id),
            LlmError::BridgeUnavailable(_) => {
                "The keyless AI bridge is not available. Try again later or pick another service."
                    .to_string()
            }
            LlmError::Api { message: Some(msg), .. } if !msg.trim().is_empty() => msg.clone(),
            _ => GENERIC_ANALYSIS_FAILURE.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_is_surfaced_verbatim() {
        let err = LlmError::Api {
            status: 401,
            message: Some("Incorrect API key provided".to_string()),
        };
        assert_eq!(err.user_message(), "Incorrect API key provided");
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_network_error_uses_generic_message() {
        let err = LlmError::Network("connection reset".to_string());
        assert_eq!(err.user_message(), GENERIC_ANALYSIS_FAILURE);
    }

    #[test]
    fn test_configuration_errors_are_classified() {
        assert!(LlmError::MissingCredential("ChatGPT").is_configuration());
        assert!(LlmError::UnsupportedProvider("claude".into()).is_configuration());
        assert!(LlmError::BridgeUnavailable(Duration::from_secs(1)).is_configuration());
    }

    #[test]
    fn test_market_errors_map_to_http_errors() {
        let missing: AppError = MarketDataError::MissingCredential.into();
        assert_eq!(missing.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let upstream: AppError = MarketDataError::Upstream {
            status: 404,
            message: "Finnhub API error: 404".into(),
        }
        .into();
        assert_eq!(upstream.status(), StatusCode::NOT_FOUND);
        assert_eq!(upstream.to_string(), "Finnhub API error: 404");
    }
}
