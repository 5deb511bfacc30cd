use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use super::orchestrator::{AwaitOutcome, PaymentOrchestrator, StartOutcome, StartPayment};
use crate::config::PollingConfig;
use crate::modules::payments::models::{PaymentResult, PaymentStatus};

pub const NOT_CONFIRMED_MESSAGE: &str = "Payment not confirmed. Please try again.";
const WAITING_MESSAGE: &str = "STK Push sent. Please complete payment on your phone.";

/// What the cashier sees for one payment attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FlowState {
    Idle,
    Initiating,
    Waiting {
        correlation_id: String,
        message: String,
    },
    Succeeded {
        correlation_id: String,
        message: String,
        receipt_number: Option<String>,
    },
    /// `status` is `pending` when the attempt was not confirmed in time and
    /// may still be resolved by a late callback
    Failed {
        correlation_id: Option<String>,
        status: PaymentStatus,
        message: String,
        result_code: Option<String>,
    },
}

impl FlowState {
    pub fn is_finished(&self) -> bool {
        matches!(self, FlowState::Succeeded { .. } | FlowState::Failed { .. })
    }

    fn from_result(result: &PaymentResult) -> Self {
        if result.status.is_success() {
            FlowState::Succeeded {
                correlation_id: result.correlation_id.clone(),
                message: result.message(),
                receipt_number: result.receipt_number(),
            }
        } else {
            FlowState::Failed {
                correlation_id: Some(result.correlation_id.clone()),
                status: result.status,
                message: result.message(),
                result_code: Some(result.result_code.clone()),
            }
        }
    }
}

/// Runs one payment attempt on behalf of a user-facing action
///
/// Observers follow progress through [`watch`](PaymentFlow::watch); dropping
/// the flow stops watching but never cancels the attempt at the gateway.
pub struct PaymentFlow {
    orchestrator: Arc<PaymentOrchestrator>,
    policy: PollingConfig,
    state: watch::Sender<FlowState>,
}

impl PaymentFlow {
    pub fn new(orchestrator: Arc<PaymentOrchestrator>, policy: PollingConfig) -> Self {
        let (state, _) = watch::channel(FlowState::Idle);
        Self {
            orchestrator,
            policy,
            state,
        }
    }

    pub fn watch(&self) -> watch::Receiver<FlowState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> FlowState {
        self.state.borrow().clone()
    }

    fn publish(&self, state: FlowState) -> FlowState {
        self.state.send_replace(state.clone());
        state
    }

    /// Start the push and wait for its terminal state
    pub async fn run(&self, payment: StartPayment) -> FlowState {
        self.publish(FlowState::Initiating);

        let correlation_id = match self.orchestrator.start(payment).await {
            Ok(StartOutcome::Pending { correlation_id, .. }) => correlation_id,
            Ok(StartOutcome::Failed(failure)) => {
                return self.publish(FlowState::Failed {
                    correlation_id: None,
                    status: failure.status,
                    message: failure.reason,
                    result_code: None,
                });
            }
            Err(e) => {
                return self.publish(FlowState::Failed {
                    correlation_id: None,
                    status: PaymentStatus::Failed,
                    message: e.user_message(),
                    result_code: None,
                });
            }
        };

        self.publish(FlowState::Waiting {
            correlation_id: correlation_id.clone(),
            message: WAITING_MESSAGE.to_string(),
        });

        match self
            .orchestrator
            .await_resolution(&correlation_id, self.policy)
            .await
        {
            AwaitOutcome::Resolved(result) => self.publish(FlowState::from_result(&result)),
            AwaitOutcome::NotConfirmed { .. } => self.publish(FlowState::Failed {
                correlation_id: Some(correlation_id),
                status: PaymentStatus::Pending,
                message: NOT_CONFIRMED_MESSAGE.to_string(),
                result_code: None,
            }),
        }
    }
}
