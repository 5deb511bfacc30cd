//! Tillpay point-of-sale payment core
//!
//! Sends M-Pesa STK push requests, reconciles the gateway's poll answers and
//! callbacks into one terminal result per attempt, and records completed
//! payments in the ledger, the open register session and customer debt.

pub mod app;
pub mod config;
pub mod core;
pub mod middleware;
pub mod modules;

// Re-export commonly used types
pub use app::{AppServices, Stores};
pub use modules::customers;
pub use modules::gateways;
pub use modules::payments;
pub use modules::register;
pub use modules::transactions;
