pub mod payment_request;
pub mod payment_result;
pub mod payment_status;
pub mod stk_callback;

pub use payment_request::{PaymentRecord, PaymentRequest};
pub use payment_result::{PaymentResult, RECEIPT_NUMBER_KEY};
pub use payment_status::{PaymentStatus, ResultSource};
pub use stk_callback::{parse_stk_callback, CallbackParseError};
