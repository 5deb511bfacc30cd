use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{PaymentResult, PaymentStatus};

/// One attempt to collect money through an STK push
///
/// Created once the gateway acknowledges the push and never modified
/// afterwards; `correlation_id` joins the poll path and the callback path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub correlation_id: String,
    pub merchant_request_id: String,
    /// Canonical `254XXXXXXXXX` phone number
    pub payer_reference: String,
    pub amount: Decimal,
    pub account_reference: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// A stored attempt together with its reconciliation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub request: PaymentRequest,
    pub status: PaymentStatus,
    /// The result that moved the attempt out of `pending`
    pub resolution: Option<PaymentResult>,
    /// Whether the ledger and register have been updated for the resolution
    pub ledger_applied: bool,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    pub fn pending(request: PaymentRequest) -> Self {
        Self {
            request,
            status: PaymentStatus::Pending,
            resolution: None,
            ledger_applied: false,
            resolved_at: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status.is_terminal()
    }
}
