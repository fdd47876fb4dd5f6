use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("LOKI_ENABLED is set but LOKI_URL is not")]
    MissingLokiUrl,

    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("failed to set up Loki: {0}")]
    Loki(String),

    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub loki_url: Option<String>,
    pub loki_enabled: bool,
    pub service_name: String,
    pub environment: String,
    pub filter: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            loki_url: lookup("LOKI_URL").filter(|u| !u.trim().is_empty()),
            loki_enabled: matches!(
                var("LOKI_ENABLED", "false").to_ascii_lowercase().as_str(),
                "true" | "1" | "yes"
            ),
            service_name: var("SERVICE_NAME", "aimystocks"),
            environment: var("ENVIRONMENT", "development"),
            filter: var("RUST_LOG", "info"),
        }
    }

    pub fn validate(&self) -> Result<(), LoggingError> {
        if self.loki_enabled && self.loki_url.is_none() {
            return Err(LoggingError::MissingLokiUrl);
        }
        self.env_filter().map(|_| ())
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_new(&self.filter).map_err(|e| LoggingError::InvalidFilter {
            filter: self.filter.clone(),
            message: e.to_string(),
        })
    }
}

/// Installs the global subscriber: console output, plus Loki when enabled
/// and compiled in. Call once, before anything logs.
pub fn init_logging(config: LoggingConfig) -> Result<(), LoggingError> {
    config.validate()?;

    #[cfg(feature = "loki")]
    {
        if let (true, Some(loki_url)) = (config.loki_enabled, config.loki_url.as_deref()) {
            return init_with_loki(&config, loki_url);
        }
    }

    tracing_subscriber::registry()
        .with(config.env_filter()?)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(
        "📊 Console logging initialized for {} ({})",
        config.service_name,
        config.environment
    );
    Ok(())
}

#[cfg(feature = "loki")]
fn init_with_loki(config: &LoggingConfig, loki_url: &str) -> Result<(), LoggingError> {
    let loki_err = |e: &dyn std::fmt::Display| LoggingError::Loki(e.to_string());

    let url = url::Url::parse(loki_url).map_err(|e| loki_err(&e))?;
    let (loki_layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)
        .and_then(|b| b.label("environment", &config.environment))
        .and_then(|b| b.build_url(url))
        .map_err(|e| loki_err(&e))?;

    tracing_subscriber::registry()
        .with(config.env_filter()?)
        .with(tracing_subscriber::fmt::layer())
        .with(loki_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    // Ships buffered events to Loki for the lifetime of the process.
    tokio::spawn(task);

    tracing::info!("✅ Loki logging initialized at {}", loki_url);
    Ok(())
}
