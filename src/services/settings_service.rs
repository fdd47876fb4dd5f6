use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{AiProvider, AnalysisConfig, AnalysisPreferences, UpdatePreferences};
use crate::store::local_store::{LocalStore, CONTEXT_KEY, LANGUAGE_KEY, PROVIDER_KEY};

/// Reads the remembered preferences. Missing keys take their defaults.
pub async fn load(store: &LocalStore) -> Result<AnalysisPreferences, AppError> {
    let defaults = AnalysisPreferences::default();

    let provider = match store.load::<String>(PROVIDER_KEY).await? {
        Some(id) => id.parse::<AiProvider>().unwrap_or_else(|_| {
            warn!("Ignoring stored AI service '{}'", id);
            defaults.provider
        }),
        None => defaults.provider,
    };
    let language = store
        .load::<String>(LANGUAGE_KEY)
        .await?
        .filter(|l| !l.trim().is_empty())
        .unwrap_or(defaults.language);
    let free_text_context = store
        .load::<String>(CONTEXT_KEY)
        .await?
        .unwrap_or(defaults.free_text_context);

    Ok(AnalysisPreferences {
        provider,
        language,
        free_text_context,
    })
}

/// Applies the fields present in `update`; each one is written to its own key.
pub async fn update(store: &LocalStore, update: UpdatePreferences) -> Result<AnalysisPreferences, AppError> {
    let mut prefs = load(store).await?;

    if let Some(id) = update.provider {
        let provider = id
            .trim()
            .parse::<AiProvider>()
            .map_err(|e| AppError::Validation(e.user_message()))?;
        store.save(PROVIDER_KEY, provider.id()).await?;
        prefs.provider = provider;
    }
    if let Some(language) = update.language {
        let language = language.trim();
        if language.is_empty() {
            return Err(AppError::Validation("Language must not be empty".to_string()));
        }
        store.save(LANGUAGE_KEY, language).await?;
        prefs.language = language.to_string();
    }
    if let Some(context) = update.free_text_context {
        store.save(CONTEXT_KEY, &context).await?;
        prefs.free_text_context = context;
    }

    info!(
        "Preferences updated (service: {}, language: {})",
        prefs.provider.id(),
        prefs.language
    );
    Ok(prefs)
}

/// Stores the selection used by an analysis run. The credential is never written.
pub async fn remember(store: &LocalStore, config: &AnalysisConfig) -> Result<(), AppError> {
    store.save(PROVIDER_KEY, config.provider.id()).await?;
    store.save(LANGUAGE_KEY, &config.language).await?;
    store.save(CONTEXT_KEY, &config.free_text_context).await?;
    Ok(())
}
