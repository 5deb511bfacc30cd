pub mod register_service;

pub use register_service::{CashRegister, RegisterService};
