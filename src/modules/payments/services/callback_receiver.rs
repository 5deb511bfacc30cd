use std::sync::Arc;
use tracing::{error, info, warn};

use super::orchestrator::{PaymentOrchestrator, ResolveOutcome};
use crate::modules::payments::models::{parse_stk_callback, CallbackParseError};

/// What became of one callback delivery; never surfaced to the gateway
#[derive(Debug)]
pub enum CallbackDisposition {
    Resolved(ResolveOutcome),
    Malformed(CallbackParseError),
    Failed(String),
}

/// Turns gateway callbacks into callback-sourced results
///
/// Every outcome, including internal failures, ends in a log line rather
/// than an error so the endpoint can always acknowledge the delivery.
#[derive(Clone)]
pub struct CallbackReceiver {
    orchestrator: Arc<PaymentOrchestrator>,
}

impl CallbackReceiver {
    pub fn new(orchestrator: Arc<PaymentOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub async fn handle(&self, body: &[u8]) -> CallbackDisposition {
        let result = match parse_stk_callback(body) {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    error = %e,
                    body = %String::from_utf8_lossy(body),
                    "Ignoring malformed payment callback"
                );
                return CallbackDisposition::Malformed(e);
            }
        };

        let correlation_id = result.correlation_id.clone();
        info!(
            correlation_id = %correlation_id,
            result_code = %result.result_code,
            status = %result.status,
            "Payment callback received"
        );

        match self.orchestrator.resolve(&correlation_id, result).await {
            Ok(outcome) => CallbackDisposition::Resolved(outcome),
            Err(e) => {
                error!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "Failed to reconcile payment callback"
                );
                CallbackDisposition::Failed(e.to_string())
            }
        }
    }
}
