use std::sync::Arc;

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::PollingConfig;
use crate::core::error::AppError;
use crate::modules::payments::models::{PaymentRecord, PaymentResult};
use crate::modules::payments::services::{
    CallbackReceiver, PaymentOrchestrator, PollOutcome, StartOutcome, StartPayment,
};
use crate::modules::transactions::models::TransactionType;

/// Body of `POST /payments/initiate`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    #[serde(alias = "phoneNumber")]
    pub payer_reference: Option<String>,
    pub amount: Option<Decimal>,
    pub account_reference: Option<String>,
    #[serde(alias = "transactionDesc")]
    pub description: Option<String>,
    /// Ledger entry kind; defaults to `sale`
    pub transaction_type: Option<TransactionType>,
    pub customer_id: Option<String>,
}

impl InitiatePaymentRequest {
    fn into_start(self) -> Result<StartPayment, AppError> {
        let mut missing = Vec::new();
        if self.payer_reference.as_deref().map_or(true, |p| p.trim().is_empty()) {
            missing.push("payerReference");
        }
        if self.amount.is_none() {
            missing.push("amount");
        }
        if self.account_reference.as_deref().map_or(true, |a| a.trim().is_empty()) {
            missing.push("accountReference");
        }
        if !missing.is_empty() {
            return Err(AppError::validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(StartPayment {
            payer_reference: self.payer_reference.unwrap_or_default(),
            amount: self.amount.unwrap_or_default(),
            account_reference: self.account_reference.unwrap_or_default(),
            description: self.description,
            transaction_type: self.transaction_type.unwrap_or(TransactionType::Sale),
            customer_id: self.customer_id,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentResponse {
    pub correlation_id: String,
    pub merchant_request_id: String,
    pub accepted: bool,
    pub customer_message: Option<String>,
}

/// Body of `POST /payments/status`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusRequest {
    #[serde(alias = "CheckoutRequestID")]
    pub correlation_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub correlation_id: String,
    pub status: String,
    pub result_code: String,
    pub result_description: String,
    /// Cashier-facing explanation of the status
    pub message: String,
    pub receipt_number: Option<String>,
}

impl From<PaymentResult> for PaymentStatusResponse {
    fn from(result: PaymentResult) -> Self {
        Self {
            message: result.message(),
            receipt_number: result.receipt_number(),
            status: result.status.to_string(),
            correlation_id: result.correlation_id,
            result_code: result.result_code,
            result_description: result.result_description,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetailsResponse {
    pub record: PaymentRecord,
    pub history: Vec<PaymentResult>,
}

/// Acknowledgement the gateway expects from a callback endpoint
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallbackAck {
    #[serde(rename = "ResultCode")]
    pub result_code: i32,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
}

impl CallbackAck {
    pub fn success() -> Self {
        Self {
            result_code: 0,
            result_desc: "Success".to_string(),
        }
    }
}

/// Send an STK push
/// POST /payments/initiate
///
/// An accepted attempt keeps being polled in the background on the
/// configured policy, whether or not the till checks its status.
pub async fn initiate_payment(
    orchestrator: web::Data<Arc<PaymentOrchestrator>>,
    polling: web::Data<PollingConfig>,
    request: web::Json<InitiatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let start = request.into_inner().into_start()?;

    match orchestrator.start(start).await? {
        StartOutcome::Pending {
            correlation_id,
            merchant_request_id,
            customer_message,
        } => {
            orchestrator.spawn_watch(correlation_id.clone(), *polling.get_ref());

            Ok(HttpResponse::Accepted().json(InitiatePaymentResponse {
                correlation_id,
                merchant_request_id,
                accepted: true,
                customer_message,
            }))
        }
        StartOutcome::Failed(failure) => Err(failure.to_error()),
    }
}

/// Check a payment attempt once
/// POST /payments/status
pub async fn payment_status(
    orchestrator: web::Data<Arc<PaymentOrchestrator>>,
    request: web::Json<PaymentStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let correlation_id = request
        .into_inner()
        .correlation_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::validation("correlationId is required"))?;

    match orchestrator.poll(&correlation_id).await? {
        PollOutcome::Resolved(result) => {
            Ok(HttpResponse::Ok().json(PaymentStatusResponse::from(result)))
        }
        PollOutcome::StillPending => Err(AppError::StillProcessing),
    }
}

/// Stored attempt with its full result trail
/// GET /payments/{correlation_id}
pub async fn get_payment(
    orchestrator: web::Data<Arc<PaymentOrchestrator>>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let correlation_id = path.into_inner();
    let store = orchestrator.store();

    let record = store
        .find(&correlation_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Payment {}", correlation_id)))?;
    let history = store.history(&correlation_id).await?;

    Ok(HttpResponse::Ok().json(PaymentDetailsResponse { record, history }))
}

/// Gateway callback
/// POST /payments/callback
///
/// Always acknowledged; processing problems are only logged.
pub async fn payment_callback(
    receiver: web::Data<CallbackReceiver>,
    body: web::Bytes,
) -> HttpResponse {
    receiver.handle(&body).await;
    HttpResponse::Ok().json(CallbackAck::success())
}

/// Configure payment routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("/initiate", web::post().to(initiate_payment))
            .route("/status", web::post().to(payment_status))
            .route("/callback", web::post().to(payment_callback))
            .route("/{correlation_id}", web::get().to(get_payment)),
    );
}
