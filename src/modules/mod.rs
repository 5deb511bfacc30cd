pub mod customers;
pub mod gateways;
pub mod health;
pub mod payments;
pub mod register;
pub mod transactions;
