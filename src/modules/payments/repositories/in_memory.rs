use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

use super::payment_store::{PaymentStore, ResolveAttempt};
use crate::core::{AppError, Result};
use crate::modules::payments::models::{PaymentRecord, PaymentRequest, PaymentResult};

#[derive(Default)]
struct Cache {
    records: HashMap<String, PaymentRecord>,
    results: HashMap<String, Vec<PaymentResult>>,
}

/// Process-local result cache
///
/// The mutex is held across each check-and-set, which makes every
/// operation atomic per call. No await happens while it is held.
#[derive(Default)]
pub struct InMemoryPaymentStore {
    cache: Mutex<Cache>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Cache>> {
        self.cache
            .lock()
            .map_err(|_| AppError::internal("payment cache lock poisoned"))
    }
}

fn transition(record: &mut PaymentRecord, result: &PaymentResult) {
    record.status = result.status;
    record.resolution = Some(result.clone());
    record.ledger_applied = false;
    record.resolved_at = Some(Utc::now());
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert_pending(&self, request: &PaymentRequest) -> Result<Option<PaymentResult>> {
        let mut cache = self.lock()?;

        if cache.records.contains_key(&request.correlation_id) {
            return Err(AppError::validation(format!(
                "Payment request {} already exists",
                request.correlation_id
            )));
        }

        let orphan = cache
            .results
            .get(&request.correlation_id)
            .and_then(|results| results.iter().find(|r| r.status.is_terminal()))
            .cloned();

        let mut record = PaymentRecord::pending(request.clone());
        if let Some(result) = &orphan {
            transition(&mut record, result);
        }
        cache.records.insert(request.correlation_id.clone(), record);

        Ok(orphan)
    }

    async fn find(&self, correlation_id: &str) -> Result<Option<PaymentRecord>> {
        Ok(self.lock()?.records.get(correlation_id).cloned())
    }

    async fn record_result(&self, result: &PaymentResult) -> Result<ResolveAttempt> {
        let mut cache = self.lock()?;

        cache
            .results
            .entry(result.correlation_id.clone())
            .or_default()
            .push(result.clone());

        let Some(record) = cache.records.get_mut(&result.correlation_id) else {
            return Ok(ResolveAttempt::Unknown);
        };

        if record.is_resolved() || !result.status.is_terminal() {
            return Ok(ResolveAttempt::AlreadyResolved(record.clone()));
        }

        transition(record, result);
        Ok(ResolveAttempt::Transitioned(record.clone()))
    }

    async fn mark_ledger_applied(&self, correlation_id: &str) -> Result<()> {
        let mut cache = self.lock()?;
        let record = cache
            .records
            .get_mut(correlation_id)
            .ok_or_else(|| AppError::not_found(format!("Payment request {}", correlation_id)))?;
        record.ledger_applied = true;
        Ok(())
    }

    async fn history(&self, correlation_id: &str) -> Result<Vec<PaymentResult>> {
        Ok(self
            .lock()?
            .results
            .get(correlation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<()> {
        self.lock().map(|_| ())
    }
}
