use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{AppError, Result};
use crate::modules::register::models::RegisterEffect;

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Sale,
    Refund,
    Purchase,
    Payment,
    Debt,
}

impl TransactionType {
    /// How a completed transaction of this type, paid with `method`, moves the register
    pub fn register_effect(&self, method: PaymentMethod) -> RegisterEffect {
        match (self, method) {
            (TransactionType::Sale | TransactionType::Payment, _) => RegisterEffect::Credit,
            (TransactionType::Purchase, PaymentMethod::Exchange) => RegisterEffect::TenderOnly,
            (TransactionType::Refund | TransactionType::Purchase, _) => RegisterEffect::Debit,
            (TransactionType::Debt, _) => RegisterEffect::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Sale => "sale",
            TransactionType::Refund => "refund",
            TransactionType::Purchase => "purchase",
            TransactionType::Payment => "payment",
            TransactionType::Debt => "debt",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sale" => Ok(TransactionType::Sale),
            "refund" => Ok(TransactionType::Refund),
            "purchase" => Ok(TransactionType::Purchase),
            "payment" => Ok(TransactionType::Payment),
            "debt" => Ok(TransactionType::Debt),
            _ => Err(format!("Invalid transaction type: {}", s)),
        }
    }
}

/// Tender used for a transaction; each has its own register total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Mobile,
    Exchange,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Mobile => "mobile",
            PaymentMethod::Exchange => "exchange",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "mobile" => Ok(PaymentMethod::Mobile),
            "exchange" => Ok(PaymentMethod::Exchange),
            _ => Err(format!("Invalid payment method: {}", s)),
        }
    }
}

/// Transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Waiting for the payment outcome
    #[default]
    Pending,

    Completed,

    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            _ => Err(format!("Invalid transaction status: {}", s)),
        }
    }
}

/// Terminal outcome written onto a pending transaction
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionOutcome {
    /// Gateway confirmation payload (receipt number, result description, metadata)
    Completed { confirmation: Value },
    Failed { reason: String },
}

impl TransactionOutcome {
    pub fn status(&self) -> TransactionStatus {
        match self {
            TransactionOutcome::Completed { .. } => TransactionStatus::Completed,
            TransactionOutcome::Failed { .. } => TransactionStatus::Failed,
        }
    }
}

/// Ledger entry
///
/// Payment-backed entries are created `pending` with the gateway correlation
/// id and move to `completed` or `failed` exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,

    #[serde(rename = "type")]
    pub transaction_type: TransactionType,

    pub amount: Decimal,

    pub payment_method: PaymentMethod,

    pub status: TransactionStatus,

    /// Gateway correlation id for push-paid transactions
    pub correlation_id: Option<String>,

    pub account_reference: Option<String>,

    pub customer_id: Option<String>,

    pub payment_confirmation: Option<Value>,

    pub failure_reason: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a pending mobile-money transaction awaiting the gateway result
    ///
    /// # Arguments
    /// * `transaction_type` - Ledger entry kind
    /// * `amount` - Amount requested from the payer
    /// * `correlation_id` - Gateway correlation id of the push
    /// * `account_reference` - Customer code or sale id sent with the push
    /// * `customer_id` - Customer whose debt a `payment` settles
    pub fn pending_mobile(
        transaction_type: TransactionType,
        amount: Decimal,
        correlation_id: String,
        account_reference: String,
        customer_id: Option<String>,
    ) -> Result<Self> {
        if amount <= Decimal::ZERO {
            return Err(AppError::validation("Transaction amount must be positive"));
        }

        if correlation_id.trim().is_empty() {
            return Err(AppError::validation("Correlation id cannot be empty"));
        }

        let now = Utc::now();
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            transaction_type,
            amount,
            payment_method: PaymentMethod::Mobile,
            status: TransactionStatus::Pending,
            correlation_id: Some(correlation_id),
            account_reference: Some(account_reference),
            customer_id,
            payment_confirmation: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    /// Apply a terminal outcome; returns false if the transaction was not pending
    pub fn apply_outcome(&mut self, outcome: &TransactionOutcome) -> bool {
        if !self.is_pending() {
            return false;
        }

        self.status = outcome.status();
        match outcome {
            TransactionOutcome::Completed { confirmation } => {
                self.payment_confirmation = Some(confirmation.clone());
            }
            TransactionOutcome::Failed { reason } => {
                self.failure_reason = Some(reason.clone());
            }
        }
        self.updated_at = Utc::now();
        true
    }
}
