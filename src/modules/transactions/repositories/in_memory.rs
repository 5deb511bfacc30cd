use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::transaction_repository::TransactionStore;
use crate::core::{AppError, Result};
use crate::modules::transactions::models::{Transaction, TransactionOutcome};

#[derive(Default)]
struct Ledger {
    transactions: HashMap<String, Transaction>,
    by_correlation: HashMap<String, String>,
}

/// Process-local transaction ledger used when no database is configured
#[derive(Default)]
pub struct InMemoryTransactionStore {
    ledger: Mutex<Ledger>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Ledger>> {
        self.ledger
            .lock()
            .map_err(|_| AppError::internal("transaction ledger lock poisoned"))
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn append(&self, transaction: &Transaction) -> Result<()> {
        let mut ledger = self.lock()?;

        if ledger.transactions.contains_key(&transaction.id) {
            return Err(AppError::validation(format!(
                "Transaction {} already exists",
                transaction.id
            )));
        }

        if let Some(correlation_id) = &transaction.correlation_id {
            if ledger.by_correlation.contains_key(correlation_id) {
                return Err(AppError::validation(format!(
                    "A transaction for {} already exists",
                    correlation_id
                )));
            }
            ledger
                .by_correlation
                .insert(correlation_id.clone(), transaction.id.clone());
        }

        ledger
            .transactions
            .insert(transaction.id.clone(), transaction.clone());
        Ok(())
    }

    async fn find_by_correlation(&self, correlation_id: &str) -> Result<Option<Transaction>> {
        let ledger = self.lock()?;
        Ok(ledger
            .by_correlation
            .get(correlation_id)
            .and_then(|id| ledger.transactions.get(id))
            .cloned())
    }

    async fn set_outcome(&self, transaction_id: &str, outcome: &TransactionOutcome) -> Result<bool> {
        let mut ledger = self.lock()?;
        let transaction = ledger
            .transactions
            .get_mut(transaction_id)
            .ok_or_else(|| AppError::not_found(format!("Transaction {}", transaction_id)))?;

        Ok(transaction.apply_outcome(outcome))
    }
}
