mod analysis;
mod market;
mod settings;
mod transaction;

pub use analysis::{
    AiProvider, AnalysisConfig, AnalysisRequest, AnalysisResult, AnalysisState, DEFAULT_LANGUAGE,
    EMPTY_PORTFOLIO_MESSAGE,
};
pub use market::{Candle, ChartData, MarketSnapshot, Resolution};
pub use settings::{AnalysisPreferences, UpdatePreferences};
pub use transaction::{
    CreateTransaction, PortfolioSummary, PositionSummary, Transaction, TransactionType,
};
