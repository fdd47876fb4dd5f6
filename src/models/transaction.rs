use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Buy,
    Sell,
}

impl TransactionType {
    /// Sign applied when netting lots: buys add, sells subtract.
    pub fn sign(&self) -> f64 {
        match self {
            TransactionType::Buy => 1.0,
            TransactionType::Sell => -1.0,
        }
    }
}

// One recorded lot. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub ticker: String,
    pub quantity: f64,
    pub price: f64,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
}

impl Transaction {
    pub fn value(&self) -> f64 {
        self.price * self.quantity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransaction {
    pub ticker: String,
    pub quantity: f64,
    pub price: f64,
    pub date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
}

impl CreateTransaction {
    pub fn validate(&self) -> Result<(), String> {
        if self.ticker.trim().is_empty() {
            return Err("Ticker symbol is required".to_string());
        }
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err("Quantity must be greater than zero".to_string());
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err("Price must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Validates and turns the submission into a stored lot with a fresh id.
    pub fn into_transaction(self, today: NaiveDate) -> Result<Transaction, String> {
        self.validate()?;
        Ok(Transaction {
            id: Uuid::new_v4().to_string(),
            ticker: self.ticker.trim().to_uppercase(),
            quantity: self.quantity,
            price: self.price,
            date: self.date.unwrap_or(today),
            transaction_type: self.transaction_type,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSummary {
    pub ticker: String,
    pub net_quantity: f64,
    pub net_value: f64,
    pub lots: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub transaction_count: usize,
    /// Unsigned sum of price * quantity over every lot.
    pub gross_value: f64,
    /// Buys minus sells.
    pub net_value: f64,
    pub positions: Vec<PositionSummary>,
}
