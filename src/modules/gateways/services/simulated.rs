use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use super::gateway_trait::{AccessToken, PaymentGateway, PushAcknowledgement, PushRequest};
use crate::core::Result;
use crate::modules::payments::models::{PaymentResult, ResultSource};

/// Deterministic stand-in for Daraja, selected with `MPESA_SIMULATE=true`
///
/// Every push is accepted with a fresh correlation id and every status query
/// resolves as completed, so flows run end to end without network access.
#[derive(Debug, Default, Clone)]
pub struct SimulatedGateway;

impl SimulatedGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn acquire_access_token(&self) -> Result<AccessToken> {
        Ok(AccessToken {
            value: "simulated-token".to_string(),
            expires_in: Duration::from_secs(3599),
        })
    }

    async fn initiate_push(&self, request: &PushRequest) -> Result<PushAcknowledgement> {
        let correlation_id = format!("ws_CO_SIM_{}", uuid::Uuid::new_v4().simple());

        tracing::warn!(
            correlation_id = %correlation_id,
            account_reference = %request.account_reference,
            "Simulation mode: accepting STK push without contacting the gateway"
        );

        Ok(PushAcknowledgement {
            correlation_id,
            merchant_request_id: "0000-sim".to_string(),
            response_description: "Simulated Request accepted for processing".to_string(),
            customer_message: Some("Success. Request accepted for processing".to_string()),
        })
    }

    async fn query_status(&self, correlation_id: &str) -> Result<PaymentResult> {
        let raw = json!({
            "ResponseCode": "0",
            "ResponseDescription": "The service request has been accepted successfully",
            "MerchantRequestID": "0000-sim",
            "CheckoutRequestID": correlation_id,
            "ResultCode": "0",
            "ResultDesc": "The service request is processed successfully.",
        });

        Ok(PaymentResult::from_gateway(
            correlation_id,
            "0",
            "The service request is processed successfully.",
            ResultSource::Poll,
            raw,
        )
        .with_merchant_request_id(Some("0000-sim".to_string())))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
