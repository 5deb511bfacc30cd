pub mod register_session;

pub use register_session::{
    PaymentTotals, RegisterEffect, RegisterEvent, RegisterOutcome, RegisterSession, SessionStatus,
};
