pub mod transaction;

pub use transaction::{
    PaymentMethod, Transaction, TransactionOutcome, TransactionStatus, TransactionType,
};
