pub mod models;
pub mod repositories;

pub use models::{PaymentMethod, Transaction, TransactionOutcome, TransactionStatus, TransactionType};
pub use repositories::{InMemoryTransactionStore, MySqlTransactionRepository, TransactionStore};
