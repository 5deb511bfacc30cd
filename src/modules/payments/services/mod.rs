pub mod callback_receiver;
pub mod orchestrator;
pub mod payment_flow;

pub use callback_receiver::{CallbackDisposition, CallbackReceiver};
pub use orchestrator::{
    AwaitOutcome, FailureCause, PaymentOrchestrator, PollOutcome, ResolveOutcome, StartFailure,
    StartOutcome, StartPayment, DEFAULT_DESCRIPTION,
};
pub use payment_flow::{FlowState, PaymentFlow, NOT_CONFIRMED_MESSAGE};
