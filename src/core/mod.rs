pub mod amount;
pub mod error;
pub mod phone;

pub use error::{AppError, Result};
pub use phone::normalize_msisdn;
