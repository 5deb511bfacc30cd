pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use controllers::configure;
pub use models::{PaymentRecord, PaymentRequest, PaymentResult, PaymentStatus, ResultSource};
pub use repositories::{InMemoryPaymentStore, MySqlPaymentStore, PaymentStore, ResolveAttempt};
pub use services::{
    AwaitOutcome, CallbackReceiver, FlowState, PaymentFlow, PaymentOrchestrator, PollOutcome,
    ResolveOutcome, StartOutcome, StartPayment,
};
