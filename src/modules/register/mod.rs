pub mod models;
pub mod services;

pub use models::{RegisterEffect, RegisterEvent, RegisterOutcome, RegisterSession};
pub use services::{CashRegister, RegisterService};
