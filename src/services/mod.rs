pub mod ai_bridge;
pub mod analysis_service;
pub mod holdings_service;
pub mod llm_service;
pub mod market_service;
pub mod normalizer;
pub mod prompt_service;
pub mod settings_service;
