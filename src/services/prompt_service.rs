use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{AiProvider, AnalysisConfig, MarketSnapshot, Transaction};

/// System and user prompt for one analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

impl PromptPair {
    /// Single-blob form for providers without role-tagged messages.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

/// Builds the prompts. `now` stamps both the analysis date and the market data block.
pub fn build_prompt(
    transactions: &[Transaction],
    snapshots: &[MarketSnapshot],
    config: &AnalysisConfig,
    now: DateTime<Utc>,
) -> PromptPair {
    PromptPair {
        system: build_system_prompt(&config.language, now.date_naive()),
        user: build_user_prompt(transactions, snapshots, config, now),
    }
}

fn format_analysis_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn build_system_prompt(language: &str, analysis_date: NaiveDate) -> String {
    format!(
        r#"You are a senior financial analyst with 20+ years in portfolio management and AI-driven insights. Analyze portfolios objectively using data as of {date}. When current market data is provided, use it instead of the historical purchase prices.

Follow this chain-of-thought:
1) Summarize the holdings and calculate metrics (total value, gain/loss per position).
2) Identify trends (sector performance, volatility, recent price changes).
3) Assess risks (diversification, concentration, market exposure).
4) Recommend concrete actions (buy/sell/hold with rationale).

IMPORTANT: Provide your entire response in {language}.

Output in this EXACT JSON format:
{{
  "analysis": "Full analysis in markdown with the sections: ## Summary, ## Trends, ## Performance Metrics, ## Risks (in {language})",
  "insights": ["Key insight 1", "Key insight 2", "Key insight 3"],
  "recommendations": ["Actionable recommendation 1", "Actionable recommendation 2", "Actionable recommendation 3"]
}}

Be specific, data-driven, and professional. Limit the analysis to 500-800 words."#,
        date = format_analysis_date(analysis_date),
        language = language,
    )
}

fn provider_suffix(provider: AiProvider) -> Option<&'static str> {
    match provider {
        AiProvider::ChatGpt => Some("Deliver expert, balanced insights."),
        AiProvider::Gemini => Some("Focus on multimodal patterns if applicable."),
        AiProvider::Grok => Some("Provide witty yet insightful analysis."),
        AiProvider::KeylessProxy => None,
    }
}

fn build_user_prompt(
    transactions: &[Transaction],
    snapshots: &[MarketSnapshot],
    config: &AnalysisConfig,
    now: DateTime<Utc>,
) -> String {
    // Vec<Transaction> and Vec<MarketSnapshot> always serialize.
    let holdings = serde_json::to_string_pretty(transactions).unwrap_or_default();

    let mut prompt = format!(
        "Portfolio holdings for analysis (purchase data):\n{}",
        holdings
    );

    if !snapshots.is_empty() {
        let market = serde_json::to_string_pretty(snapshots).unwrap_or_default();
        prompt.push_str(&format!(
            "\n\nLATEST MARKET DATA (as of {}):\n{}\n\nUse the latest market data above for valuation, performance and recommendations, not the purchase prices.",
            now.format("%Y-%m-%d %H:%M:%S UTC"),
            market
        ));
    }

    let context = config.free_text_context.trim();
    if !context.is_empty() {
        prompt.push_str(&format!(
            "\nAdditional user context/instructions: {}",
            config.free_text_context
        ));
    }

    if let Some(suffix) = provider_suffix(config.provider) {
        prompt.push(' ');
        prompt.push_str(suffix);
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 2, 14, 30, 0).unwrap()
    }

    fn lot(id: &str, ticker: &str, transaction_type: TransactionType) -> Transaction {
        Transaction {
            id: id.to_string(),
            ticker: ticker.to_string(),
            quantity: 10.0,
            price: 150.25,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            transaction_type,
        }
    }

    fn snapshot(symbol: &str) -> MarketSnapshot {
        MarketSnapshot {
            symbol: symbol.to_string(),
            current_price: 227.5,
            change: 1.5,
            change_percent: 0.66,
            day_high: 228.0,
            day_low: 224.1,
            day_open: 225.0,
            previous_close: 226.0,
            fetched_at_epoch_millis: 1_759_415_400_000,
        }
    }

    #[test]
    fn test_user_prompt_contains_every_ticker_and_field() {
        let transactions = vec![
            lot("1", "AAPL", TransactionType::Buy),
            lot("2", "MSFT", TransactionType::Sell),
            lot("3", "BRK.B", TransactionType::Buy),
        ];
        let prompt = build_prompt(&transactions, &[], &AnalysisConfig::new(AiProvider::ChatGpt), now());

        for ticker in ["AAPL", "MSFT", "BRK.B"] {
            assert!(prompt.user.contains(ticker), "missing {}", ticker);
        }
        assert!(prompt.user.contains("\"type\": \"sell\""));
        assert!(prompt.user.contains("\"date\": \"2024-03-01\""));
        assert!(prompt.user.contains("150.25"));
    }

    #[test]
    fn test_system_prompt_fixes_contract_and_language() {
        let mut config = AnalysisConfig::new(AiProvider::Gemini);
        config.language = "Español".to_string();

        let prompt = build_prompt(&[lot("1", "AAPL", TransactionType::Buy)], &[], &config, now());

        assert!(prompt.system.contains("senior financial analyst"));
        assert!(prompt.system.contains("October 2, 2025"));
        assert!(prompt.system.contains("entire response in Español"));
        for section in ["## Summary", "## Trends", "## Performance Metrics", "## Risks"] {
            assert!(prompt.system.contains(section));
        }
        for key in ["\"analysis\"", "\"insights\"", "\"recommendations\""] {
            assert!(prompt.system.contains(key));
        }
    }

    #[test]
    fn test_market_data_block_only_when_snapshots_present() {
        let transactions = vec![lot("1", "AAPL", TransactionType::Buy)];
        let config = AnalysisConfig::new(AiProvider::KeylessProxy);

        let without = build_prompt(&transactions, &[], &config, now());
        assert!(!without.user.contains("LATEST MARKET DATA"));

        let with = build_prompt(&transactions, &[snapshot("AAPL")], &config, now());
        assert!(with.user.contains("LATEST MARKET DATA (as of 2025-10-02 14:30:00 UTC)"));
        assert!(with.user.contains("\"currentPrice\": 227.5"));
    }

    #[test]
    fn test_free_text_context_appended_verbatim() {
        let transactions = vec![lot("1", "AAPL", TransactionType::Buy)];
        let mut config = AnalysisConfig::new(AiProvider::ChatGpt);
        config.free_text_context = "Focus on long-term growth".to_string();

        let prompt = build_prompt(&transactions, &[], &config, now());
        assert!(prompt
            .user
            .contains("Additional user context/instructions: Focus on long-term growth"));

        config.free_text_context = "   ".to_string();
        let blank = build_prompt(&transactions, &[], &config, now());
        assert!(!blank.user.contains("Additional user context"));
    }

    #[test]
    fn test_provider_suffixes_leave_schema_untouched() {
        let transactions = vec![lot("1", "AAPL", TransactionType::Buy)];

        let grok = build_prompt(&transactions, &[], &AnalysisConfig::new(AiProvider::Grok), now());
        let gemini = build_prompt(&transactions, &[], &AnalysisConfig::new(AiProvider::Gemini), now());
        let chatgpt = build_prompt(&transactions, &[], &AnalysisConfig::new(AiProvider::ChatGpt), now());
        let keyless = build_prompt(&transactions, &[], &AnalysisConfig::new(AiProvider::KeylessProxy), now());

        assert!(grok.user.ends_with("Provide witty yet insightful analysis."));
        assert!(gemini.user.ends_with("Focus on multimodal patterns if applicable."));
        assert!(chatgpt.user.ends_with("Deliver expert, balanced insights."));
        assert!(keyless.user.ends_with('}') || keyless.user.ends_with(']'));

        assert_eq!(grok.system, gemini.system);
        assert_eq!(gemini.system, keyless.system);
    }

    #[test]
    fn test_combined_joins_with_blank_line() {
        let pair = PromptPair {
            system: "S".to_string(),
            user: "U".to_string(),
        };
        assert_eq!(pair.combined(), "S\n\nU");
    }
}
