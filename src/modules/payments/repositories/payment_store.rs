use async_trait::async_trait;

use crate::core::Result;
use crate::modules::payments::models::{PaymentRecord, PaymentRequest, PaymentResult};

/// Outcome of offering a terminal result to the store
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveAttempt {
    /// This result moved the attempt out of `pending`
    Transitioned(PaymentRecord),
    /// The attempt was already terminal; the result was kept for audit only
    AlreadyResolved(PaymentRecord),
    /// No request with this correlation id; the result was kept as an orphan
    Unknown,
}

/// Reconciliation result cache keyed by gateway correlation id
///
/// Every offered result is appended to the audit trail. The `pending ->
/// terminal` transition in [`record_result`](PaymentStore::record_result)
/// is a single atomic step per correlation id, so of any number of
/// concurrent results exactly one observes `Transitioned`.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Store a new pending request
    ///
    /// If a terminal result for this correlation id arrived before the
    /// request was stored, the earliest one is adopted as the resolution in
    /// the same step and returned so the caller can apply it.
    async fn insert_pending(&self, request: &PaymentRequest) -> Result<Option<PaymentResult>>;

    async fn find(&self, correlation_id: &str) -> Result<Option<PaymentRecord>>;

    /// Append `result` to the audit trail and try the `pending -> terminal` transition
    async fn record_result(&self, result: &PaymentResult) -> Result<ResolveAttempt>;

    /// Note that the ledger and register reflect the resolution
    async fn mark_ledger_applied(&self, correlation_id: &str) -> Result<()>;

    /// Every result received for a correlation id, oldest first
    async fn history(&self, correlation_id: &str) -> Result<Vec<PaymentResult>>;

    /// Readiness check
    async fn ping(&self) -> Result<()>;
}
