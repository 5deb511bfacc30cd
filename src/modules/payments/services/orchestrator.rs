use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::PollingConfig;
use crate::core::amount::{format_kes, validate_push_amount};
use crate::core::phone::{mask_msisdn, normalize_msisdn};
use crate::core::{AppError, Result};
use crate::modules::customers::CustomerAccounts;
use crate::modules::gateways::{PaymentGateway, PushRequest};
use crate::modules::payments::models::{
    PaymentRecord, PaymentRequest, PaymentResult, PaymentStatus,
};
use crate::modules::payments::repositories::{PaymentStore, ResolveAttempt};
use crate::modules::register::{CashRegister, RegisterOutcome};
use crate::modules::transactions::models::{Transaction, TransactionOutcome, TransactionType};
use crate::modules::transactions::repositories::TransactionStore;

/// Description sent with a push when the caller gives none
pub const DEFAULT_DESCRIPTION: &str = "Payment for goods/services";

const RESOLUTION_CHANNEL_CAPACITY: usize = 256;

/// Input for a new push payment attempt
#[derive(Debug, Clone)]
pub struct StartPayment {
    /// Payer phone in any accepted form
    pub payer_reference: String,
    pub amount: Decimal,
    pub account_reference: String,
    pub description: Option<String>,
    /// Ledger entry kind created for the attempt
    pub transaction_type: TransactionType,
    /// Customer whose debt a completed `payment` settles
    pub customer_id: Option<String>,
}

/// Why a push never reached the pending state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureCause {
    Rejected { code: Option<String> },
    Unavailable,
    Unauthorized,
    Other,
}

/// Synthesized `failed` outcome of a push that was not accepted
///
/// No request is stored and nothing should be polled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartFailure {
    pub status: PaymentStatus,
    pub reason: String,
    pub cause: FailureCause,
}

impl StartFailure {
    fn from_error(error: &AppError) -> Self {
        let cause = match error {
            AppError::GatewayRejected { code, .. } => FailureCause::Rejected { code: code.clone() },
            AppError::GatewayUnavailable(_) => FailureCause::Unavailable,
            AppError::Auth(_) => FailureCause::Unauthorized,
            _ => FailureCause::Other,
        };
        Self {
            status: PaymentStatus::Failed,
            reason: error.user_message(),
            cause,
        }
    }

    /// The error an HTTP caller should see for this failure
    pub fn to_error(&self) -> AppError {
        match &self.cause {
            FailureCause::Rejected { code } => AppError::rejected(self.reason.clone(), code.clone()),
            FailureCause::Unavailable => AppError::unavailable(self.reason.clone()),
            FailureCause::Unauthorized => AppError::auth(self.reason.clone()),
            FailureCause::Other => AppError::internal(self.reason.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Push accepted; the attempt is pending and may be polled
    Pending {
        correlation_id: String,
        merchant_request_id: String,
        customer_message: Option<String>,
    },
    Failed(StartFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Resolved(PaymentResult),
    StillPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveOutcome {
    Applied,
    AlreadyResolved,
    UnknownCorrelation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AwaitOutcome {
    Resolved(PaymentResult),
    /// Local timeout; the attempt stays pending in the store
    NotConfirmed { attempts: u32 },
}

/// Drives push payment attempts to a single terminal resolution
///
/// Poll responses and gateway callbacks both end up in [`resolve`], which
/// lets only the result that wins the store's `pending -> terminal`
/// transition touch the ledger, the register and customer debt.
///
/// [`resolve`]: PaymentOrchestrator::resolve
pub struct PaymentOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
    payments: Arc<dyn PaymentStore>,
    transactions: Arc<dyn TransactionStore>,
    register: Arc<dyn CashRegister>,
    customers: Arc<dyn CustomerAccounts>,
    resolutions: broadcast::Sender<PaymentResult>,
}

impl PaymentOrchestrator {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        payments: Arc<dyn PaymentStore>,
        transactions: Arc<dyn TransactionStore>,
        register: Arc<dyn CashRegister>,
        customers: Arc<dyn CustomerAccounts>,
    ) -> Self {
        let (resolutions, _) = broadcast::channel(RESOLUTION_CHANNEL_CAPACITY);
        Self {
            gateway,
            payments,
            transactions,
            register,
            customers,
            resolutions,
        }
    }

    /// Applied resolutions, published after the ledger step
    pub fn subscribe(&self) -> broadcast::Receiver<PaymentResult> {
        self.resolutions.subscribe()
    }

    pub fn store(&self) -> &Arc<dyn PaymentStore> {
        &self.payments
    }

    /// Send a push and register the attempt as pending
    ///
    /// Invalid input is returned as `Err` before the gateway is contacted.
    /// A gateway refusal or transport failure is `Ok(StartOutcome::Failed)`:
    /// nothing is stored and the caller must not poll.
    pub async fn start(&self, payment: StartPayment) -> Result<StartOutcome> {
        let payer_reference = normalize_msisdn(&payment.payer_reference)?;
        validate_push_amount(payment.amount)?;

        let account_reference = payment.account_reference.trim().to_string();
        if account_reference.is_empty() {
            return Err(AppError::validation("Account reference is required"));
        }

        let description = payment
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        let push = PushRequest {
            payer_reference,
            amount: payment.amount,
            account_reference,
            description,
        };

        let ack = match self.gateway.initiate_push(&push).await {
            Ok(ack) => ack,
            Err(AppError::Validation(msg)) => return Err(AppError::Validation(msg)),
            Err(e) => {
                warn!(
                    gateway = self.gateway.name(),
                    phone = %mask_msisdn(&push.payer_reference),
                    error = %e,
                    "STK push was not accepted"
                );
                return Ok(StartOutcome::Failed(StartFailure::from_error(&e)));
            }
        };

        let request = PaymentRequest {
            correlation_id: ack.correlation_id.clone(),
            merchant_request_id: ack.merchant_request_id.clone(),
            payer_reference: push.payer_reference,
            amount: push.amount,
            account_reference: push.account_reference,
            description: push.description,
            created_at: Utc::now(),
        };

        // Ledger entry first, so a resolution always finds its transaction
        let transaction = Transaction::pending_mobile(
            payment.transaction_type,
            request.amount,
            request.correlation_id.clone(),
            request.account_reference.clone(),
            payment.customer_id,
        )?;
        self.transactions.append(&transaction).await.map_err(|e| {
            error!(
                correlation_id = %request.correlation_id,
                error = %e,
                "Push accepted but the ledger entry could not be written"
            );
            e
        })?;

        let adopted = self.payments.insert_pending(&request).await?;

        info!(
            correlation_id = %request.correlation_id,
            transaction_id = %transaction.id,
            amount = %format_kes(request.amount),
            "Payment attempt pending"
        );

        if let Some(result) = adopted {
            info!(
                correlation_id = %request.correlation_id,
                status = %result.status,
                source = %result.source,
                "Adopted result that arrived before the request was stored"
            );
            if let Some(record) = self.payments.find(&request.correlation_id).await? {
                self.settle(&record).await?;
            }
        }

        Ok(StartOutcome::Pending {
            correlation_id: ack.correlation_id,
            merchant_request_id: ack.merchant_request_id,
            customer_message: ack.customer_message,
        })
    }

    /// Check an attempt once
    ///
    /// Answers from the store when the attempt is already terminal;
    /// otherwise queries the gateway and resolves on a terminal answer.
    /// Attempts this till never started are refused without asking the
    /// gateway. Safe to run concurrently with a callback for the same attempt.
    pub async fn poll(&self, correlation_id: &str) -> Result<PollOutcome> {
        let record = self
            .payments
            .find(correlation_id)
            .await?
            .ok_or_else(|| AppError::UnknownCorrelation(correlation_id.to_string()))?;

        if let Some(resolution) = record.resolution.clone() {
            if !record.ledger_applied {
                self.settle(&record).await?;
            }
            return Ok(PollOutcome::Resolved(resolution));
        }

        let result = match self.gateway.query_status(correlation_id).await {
            Ok(result) => result,
            Err(AppError::StillProcessing) => {
                debug!(correlation_id = %correlation_id, "Payment still processing");
                return Ok(PollOutcome::StillPending);
            }
            Err(e) => return Err(e),
        };

        if !result.status.is_terminal() {
            return Ok(PollOutcome::StillPending);
        }

        if self.resolve(correlation_id, result).await? == ResolveOutcome::UnknownCorrelation {
            return Err(AppError::UnknownCorrelation(correlation_id.to_string()));
        }

        // The callback may have won the race with a different result
        self.payments
            .find(correlation_id)
            .await?
            .and_then(|record| record.resolution)
            .map(PollOutcome::Resolved)
            .ok_or_else(|| AppError::internal(format!("Resolution for {} not stored", correlation_id)))
    }

    /// Offer a terminal result for an attempt
    ///
    /// Only the first terminal result per correlation id is applied to the
    /// ledger and register; later ones are kept for audit.
    pub async fn resolve(&self, correlation_id: &str, mut result: PaymentResult) -> Result<ResolveOutcome> {
        result.correlation_id = correlation_id.to_string();

        match self.payments.record_result(&result).await? {
            ResolveAttempt::Unknown => {
                warn!(
                    correlation_id = %correlation_id,
                    result_code = %result.result_code,
                    source = %result.source,
                    "Result for unknown correlation id kept for audit"
                );
                Ok(ResolveOutcome::UnknownCorrelation)
            }
            ResolveAttempt::Transitioned(record) => {
                info!(
                    correlation_id = %correlation_id,
                    status = %record.status,
                    result_code = %result.result_code,
                    source = %result.source,
                    "Payment resolved"
                );
                self.settle(&record).await?;
                Ok(ResolveOutcome::Applied)
            }
            ResolveAttempt::AlreadyResolved(record) => {
                info!(
                    correlation_id = %correlation_id,
                    status = %record.status,
                    result_code = %result.result_code,
                    source = %result.source,
                    "Duplicate result for resolved payment"
                );
                if !record.ledger_applied {
                    self.settle(&record).await?;
                }
                Ok(ResolveOutcome::AlreadyResolved)
            }
        }
    }

    /// Poll on the configured interval until the attempt resolves
    ///
    /// Wakes early when another path resolves the same attempt. Query
    /// errors are logged and count as an attempt. Exhausting the attempts
    /// leaves the request pending so a late callback can still resolve it.
    pub async fn await_resolution(&self, correlation_id: &str, policy: PollingConfig) -> AwaitOutcome {
        let mut resolutions = self.subscribe();

        for attempt in 1..=policy.max_attempts {
            tokio::select! {
                _ = tokio::time::sleep(policy.interval) => {}
                _ = resolved_elsewhere(&mut resolutions, correlation_id) => {
                    debug!(correlation_id = %correlation_id, attempt, "Woken by resolution");
                }
            }

            match self.poll(correlation_id).await {
                Ok(PollOutcome::Resolved(result)) => return AwaitOutcome::Resolved(result),
                Ok(PollOutcome::StillPending) => {
                    debug!(correlation_id = %correlation_id, attempt, "Payment not resolved yet");
                }
                Err(e) => {
                    warn!(correlation_id = %correlation_id, attempt, error = %e, "Status check failed");
                }
            }
        }

        info!(
            correlation_id = %correlation_id,
            attempts = policy.max_attempts,
            "Payment not confirmed in time; leaving it pending"
        );
        AwaitOutcome::NotConfirmed {
            attempts: policy.max_attempts,
        }
    }

    /// Drive a started attempt to resolution off the request path
    ///
    /// The till may stop asking at any time; this keeps polling on `policy`
    /// so the ledger catches up even when nobody is watching the attempt.
    pub fn spawn_watch(
        self: &Arc<Self>,
        correlation_id: String,
        policy: PollingConfig,
    ) -> JoinHandle<AwaitOutcome> {
        let orchestrator = Arc::clone(self);
        debug!(
            correlation_id = %correlation_id,
            max_attempts = policy.max_attempts,
            interval_secs = policy.interval.as_secs(),
            "Watching payment attempt"
        );
        tokio::spawn(async move { orchestrator.await_resolution(&correlation_id, policy).await })
    }

    /// Apply a terminal record to the ledger, register and customer debt
    ///
    /// The register and debt book are only touched when this call is the one
    /// that moves the transaction out of `pending`.
    async fn settle(&self, record: &PaymentRecord) -> Result<()> {
        let Some(resolution) = record.resolution.as_ref() else {
            return Ok(());
        };
        let correlation_id = &record.request.correlation_id;

        match self.transactions.find_by_correlation(correlation_id).await? {
            None => {
                warn!(correlation_id = %correlation_id, "No ledger transaction for resolved payment");
            }
            Some(transaction) => {
                let outcome = if resolution.status.is_success() {
                    TransactionOutcome::Completed {
                        confirmation: confirmation_payload(resolution),
                    }
                } else {
                    TransactionOutcome::Failed {
                        reason: resolution.message(),
                    }
                };

                let transitioned = self.transactions.set_outcome(&transaction.id, &outcome).await?;
                if transitioned && resolution.status.is_success() {
                    self.credit(&transaction).await;
                }
            }
        }

        self.payments.mark_ledger_applied(correlation_id).await?;
        // Nobody listening is fine
        let _ = self.resolutions.send(resolution.clone());
        Ok(())
    }

    async fn credit(&self, transaction: &Transaction) {
        let outcome = RegisterOutcome {
            transaction_id: transaction.id.clone(),
            payment_method: transaction.payment_method,
            amount: transaction.amount,
            effect: transaction
                .transaction_type
                .register_effect(transaction.payment_method),
        };
        if let Err(e) = self.register.record_outcome(&outcome).await {
            warn!(
                transaction_id = %transaction.id,
                error = %e,
                "Register not updated for completed payment"
            );
        }

        if transaction.transaction_type != TransactionType::Payment {
            return;
        }
        if let Err(e) = self.settle_debt(transaction).await {
            warn!(
                transaction_id = %transaction.id,
                customer_id = ?transaction.customer_id,
                account_reference = ?transaction.account_reference,
                error = %e,
                "Customer debt not updated for completed payment"
            );
        }
    }

    /// Reduce the paying customer's debt
    ///
    /// The customer is taken from the transaction, or else found by the
    /// account reference the push carried as its customer code.
    async fn settle_debt(&self, transaction: &Transaction) -> Result<Decimal> {
        let customer = match (&transaction.customer_id, &transaction.account_reference) {
            (Some(customer_id), _) => self.customers.find(customer_id).await?,
            (None, Some(code)) => self.customers.find_by_code(code).await?,
            (None, None) => None,
        }
        .ok_or_else(|| AppError::not_found("Customer for debt payment"))?;

        self.customers
            .apply_debt_payment(&customer.id, transaction.amount, &transaction.id)
            .await
    }
}

fn confirmation_payload(result: &PaymentResult) -> serde_json::Value {
    json!({
        "receiptNumber": result.receipt_number(),
        "resultCode": result.result_code,
        "resultDescription": result.result_description,
        "source": result.source,
        "metadata": result.metadata,
        "confirmedAt": result.received_at,
    })
}

/// Resolves once a resolution for `correlation_id` is published
async fn resolved_elsewhere(receiver: &mut broadcast::Receiver<PaymentResult>, correlation_id: &str) {
    loop {
        match receiver.recv().await {
            Ok(result) if result.correlation_id == correlation_id => return,
            Ok(_) => continue,
            // Missed events; let the poll consult the store
            Err(broadcast::error::RecvError::Lagged(_)) => return,
            Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}
