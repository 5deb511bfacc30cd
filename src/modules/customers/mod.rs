pub mod controllers;
pub mod models;
pub mod repositories;

pub use controllers::configure;
pub use models::Customer;
pub use repositories::{CustomerAccounts, InMemoryCustomerAccounts, MySqlCustomerAccounts};
