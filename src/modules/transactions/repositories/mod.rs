pub mod in_memory;
pub mod transaction_repository;

pub use in_memory::InMemoryTransactionStore;
pub use transaction_repository::{MySqlTransactionRepository, TransactionStore};
