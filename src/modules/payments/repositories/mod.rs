pub mod in_memory;
pub mod mysql;
pub mod payment_store;

pub use in_memory::InMemoryPaymentStore;
pub use mysql::MySqlPaymentStore;
pub use payment_store::{PaymentStore, ResolveAttempt};
