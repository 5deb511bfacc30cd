use crate::core::Result;
use crate::modules::payments::models::PaymentResult;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Mobile-money gateway client
///
/// Implementations are stateless request/response wrappers; any caching they
/// do (such as access tokens) must be invisible to callers.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Exchange merchant credentials for a bearer token
    ///
    /// Fails with `AppError::Auth` on a non-2xx or malformed response.
    async fn acquire_access_token(&self) -> Result<AccessToken>;

    /// Ask the gateway to prompt the payer's phone
    ///
    /// Returns the acknowledgement only, never the final result. A refusal
    /// is `AppError::GatewayRejected` carrying the gateway's description and
    /// a transport failure is `AppError::GatewayUnavailable`.
    async fn initiate_push(&self, request: &PushRequest) -> Result<PushAcknowledgement>;

    /// Query the final result of a push
    ///
    /// Returns `AppError::StillProcessing` while the payer has not responded
    /// and `AppError::QueryFailed` for any other non-success response.
    async fn query_status(&self, correlation_id: &str) -> Result<PaymentResult>;

    /// Get gateway name
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_in: Duration,
}

/// Push payment request data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushRequest {
    /// Canonical `254XXXXXXXXX` phone number
    pub payer_reference: String,

    pub amount: Decimal,

    /// Free text tying the payment to a customer code or sale id
    pub account_reference: String,

    pub description: String,
}

/// Gateway acknowledgement of an accepted push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushAcknowledgement {
    /// Gateway `CheckoutRequestID`
    pub correlation_id: String,

    pub merchant_request_id: String,

    pub response_description: String,

    /// Text the gateway suggests showing to the payer
    pub customer_message: Option<String>,
}
