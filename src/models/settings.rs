use serde::{Deserialize, Serialize};

use crate::models::analysis::{AiProvider, DEFAULT_LANGUAGE};

/// Analysis preferences remembered between sessions. Each field lives under its own key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPreferences {
    pub provider: AiProvider,
    pub language: String,
    pub free_text_context: String,
}

impl Default for AnalysisPreferences {
    fn default() -> Self {
        Self {
            provider: AiProvider::default(),
            language: DEFAULT_LANGUAGE.to_string(),
            free_text_context: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePreferences {
    pub provider: Option<String>,
    pub language: Option<String>,
    pub free_text_context: Option<String>,
}
