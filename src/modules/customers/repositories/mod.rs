pub mod customer_accounts;
pub mod in_memory;
pub mod mysql;

pub use customer_accounts::CustomerAccounts;
pub use in_memory::InMemoryCustomerAccounts;
pub use mysql::MySqlCustomerAccounts;
