use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{CreateTransaction, PortfolioSummary, PositionSummary, Transaction};
use crate::store::local_store::{LocalStore, HOLDINGS_KEY};

/// Ordered list of recorded lots, persisted under a single key.
pub struct HoldingsStore {
    store: Arc<LocalStore>,
    transactions: RwLock<Vec<Transaction>>,
}

impl HoldingsStore {
    pub async fn load(store: Arc<LocalStore>) -> Result<Self, AppError> {
        let transactions: Vec<Transaction> = store.load(HOLDINGS_KEY).await?.unwrap_or_default();
        info!("Loaded {} transactions from local store", transactions.len());

        Ok(Self {
            store,
            transactions: RwLock::new(transactions),
        })
    }

    pub async fn list(&self) -> Vec<Transaction> {
        self.transactions.read().await.clone()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn add(&self, data: CreateTransaction) -> Result<Transaction, AppError> {
        self.add_on(data, Utc::now().date_naive()).await
    }

    /// Invalid submissions are rejected before anything is stored.
    pub async fn add_on(&self, data: CreateTransaction, today: NaiveDate) -> Result<Transaction, AppError> {
        let transaction = data.into_transaction(today).map_err(|msg| {
            warn!("Rejected transaction: {}", msg);
            AppError::Validation(msg)
        })?;

        let mut transactions = self.transactions.write().await;
        let mut updated = transactions.clone();
        updated.push(transaction.clone());
        self.store.save(HOLDINGS_KEY, &updated).await?;
        *transactions = updated;

        info!(
            "Recorded {:?} of {} {} @ {}",
            transaction.transaction_type, transaction.quantity, transaction.ticker, transaction.price
        );
        Ok(transaction)
    }

    /// Returns `false` when no lot has the given id.
    pub async fn remove(&self, id: &str) -> Result<bool, AppError> {
        let mut transactions = self.transactions.write().await;
        if !transactions.iter().any(|t| t.id == id) {
            return Ok(false);
        }

        let updated: Vec<Transaction> = transactions.iter().filter(|t| t.id != id).cloned().collect();
        self.store.save(HOLDINGS_KEY, &updated).await?;
        *transactions = updated;
        Ok(true)
    }

    pub async fn summary(&self) -> PortfolioSummary {
        summarize(&self.transactions.read().await)
    }
}

/// Lots for the same ticker are combined only here, in first-seen order.
pub fn summarize(transactions: &[Transaction]) -> PortfolioSummary {
    let mut positions: Vec<PositionSummary> = Vec::new();

    for t in transactions {
        let sign = t.transaction_type.sign();
        match positions.iter_mut().find(|p| p.ticker == t.ticker) {
            Some(position) => {
                position.net_quantity += sign * t.quantity;
                position.net_value += sign * t.value();
                position.lots += 1;
            }
            None => positions.push(PositionSummary {
                ticker: t.ticker.clone(),
                net_quantity: sign * t.quantity,
                net_value: sign * t.value(),
                lots: 1,
            }),
        }
    }

    PortfolioSummary {
        transaction_count: transactions.len(),
        gross_value: transactions.iter().map(Transaction::value).sum(),
        net_value: transactions
            .iter()
            .map(|t| t.transaction_type.sign() * t.value())
            .sum(),
        positions,
    }
}
