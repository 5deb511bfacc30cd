use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::{PaymentStatus, ResultSource};
use crate::modules::gateways::services::result_codes;

/// Metadata key carrying the M-Pesa receipt number
pub const RECEIPT_NUMBER_KEY: &str = "MpesaReceiptNumber";

/// Outcome of a push payment attempt as reported by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub correlation_id: String,
    pub merchant_request_id: Option<String>,
    pub result_code: String,
    pub result_description: String,
    pub status: PaymentStatus,
    /// Flattened callback metadata (receipt number, amount, phone, ...)
    pub metadata: BTreeMap<String, Value>,
    /// Gateway body as received, kept for audit
    pub raw_payload: Value,
    pub source: ResultSource,
    pub received_at: DateTime<Utc>,
}

impl PaymentResult {
    /// Build a result from a gateway result code, deriving the status
    pub fn from_gateway(
        correlation_id: impl Into<String>,
        result_code: impl Into<String>,
        result_description: impl Into<String>,
        source: ResultSource,
        raw_payload: Value,
    ) -> Self {
        let result_code = result_code.into();
        Self {
            correlation_id: correlation_id.into(),
            merchant_request_id: None,
            status: result_codes::status_for_code(&result_code),
            result_code,
            result_description: result_description.into(),
            metadata: BTreeMap::new(),
            raw_payload,
            source,
            received_at: Utc::now(),
        }
    }

    pub fn with_merchant_request_id(mut self, merchant_request_id: Option<String>) -> Self {
        self.merchant_request_id = merchant_request_id;
        self
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Cashier-facing explanation of the status
    pub fn message(&self) -> String {
        result_codes::status_message(self.status, &self.result_description)
    }

    pub fn receipt_number(&self) -> Option<String> {
        self.metadata.get(RECEIPT_NUMBER_KEY).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }
}
