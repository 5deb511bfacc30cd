// Scripted Payment Gateway
//
// Plays back queued answers instead of calling the live gateway, so tests
// can stage each reconciliation scenario deterministically.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tillpay::core::{AppError, Result};
use tillpay::gateways::{AccessToken, PaymentGateway, PushAcknowledgement, PushRequest};
use tillpay::payments::{PaymentResult, ResultSource};

/// Answer to one `initiate_push` call
#[derive(Debug, Clone)]
pub enum PushScript {
    Accept { correlation_id: String },
    Reject { description: String, code: Option<String> },
    Unavailable,
}

/// Answer to one `query_status` call
#[derive(Debug, Clone)]
pub enum QueryScript {
    /// Gateway reports a final result code
    Result { code: String, description: String },
    StillProcessing,
    /// Transport failure; counts as a failed poll
    Unavailable,
}

impl QueryScript {
    pub fn result(code: &str, description: &str) -> Self {
        QueryScript::Result {
            code: code.to_string(),
            description: description.to_string(),
        }
    }
}

/// Gateway double driven by queued answers
///
/// An empty push queue accepts with a fresh correlation id; an empty query
/// queue answers "still processing".
#[derive(Default)]
pub struct ScriptedGateway {
    pushes: Mutex<VecDeque<PushScript>>,
    queries: Mutex<VecDeque<QueryScript>>,
    pushes_seen: Mutex<Vec<PushRequest>>,
    push_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepting(correlation_id: &str) -> Self {
        let gateway = Self::new();
        gateway.push_answer(PushScript::Accept {
            correlation_id: correlation_id.to_string(),
        });
        gateway
    }

    pub fn push_answer(&self, answer: PushScript) {
        self.pushes.lock().unwrap().push_back(answer);
    }

    pub fn query_answer(&self, answer: QueryScript) {
        self.queries.lock().unwrap().push_back(answer);
    }

    pub fn push_calls(&self) -> usize {
        self.push_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn last_push(&self) -> Option<PushRequest> {
        self.pushes_seen.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn acquire_access_token(&self) -> Result<AccessToken> {
        Ok(AccessToken {
            value: "scripted-token".to_string(),
            expires_in: std::time::Duration::from_secs(3599),
        })
    }

    async fn initiate_push(&self, request: &PushRequest) -> Result<PushAcknowledgement> {
        let call = self.push_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.pushes_seen.lock().unwrap().push(request.clone());

        let answer = self.pushes.lock().unwrap().pop_front();
        match answer.unwrap_or(PushScript::Accept {
            correlation_id: format!("ws_CO_TEST_{}", call),
        }) {
            PushScript::Accept { correlation_id } => Ok(PushAcknowledgement {
                merchant_request_id: format!("MR-{}", correlation_id),
                correlation_id,
                response_description: "Success. Request accepted for processing".to_string(),
                customer_message: Some("Success. Request accepted for processing".to_string()),
            }),
            PushScript::Reject { description, code } => Err(AppError::rejected(description, code)),
            PushScript::Unavailable => Err(AppError::unavailable("connection refused")),
        }
    }

    async fn query_status(&self, correlation_id: &str) -> Result<PaymentResult> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);

        let answer = self.queries.lock().unwrap().pop_front();
        match answer.unwrap_or(QueryScript::StillProcessing) {
            QueryScript::Result { code, description } => Ok(PaymentResult::from_gateway(
                correlation_id,
                code.clone(),
                description.clone(),
                ResultSource::Poll,
                json!({
                    "ResponseCode": "0",
                    "CheckoutRequestID": correlation_id,
                    "ResultCode": code,
                    "ResultDesc": description,
                }),
            )),
            QueryScript::StillProcessing => Err(AppError::StillProcessing),
            QueryScript::Unavailable => Err(AppError::unavailable("connection reset")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
