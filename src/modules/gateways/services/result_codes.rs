//! Daraja result codes and the statuses they map to.

use crate::modules::payments::models::PaymentStatus;

/// `errorCode` Daraja returns from the query API while the push is unresolved
pub const STILL_PROCESSING_ERROR_CODE: &str = "500.001.1001";

/// Map a gateway result code to a payment status
///
/// Both `1` and `2001` are reported as insufficient funds. Any code not in
/// the table is a plain failure.
pub fn status_for_code(code: &str) -> PaymentStatus {
    match code.trim() {
        "0" => PaymentStatus::Completed,
        "1" | "2001" => PaymentStatus::InsufficientFunds,
        "1032" => PaymentStatus::Cancelled,
        "1037" => PaymentStatus::Timeout,
        "2002" => PaymentStatus::WrongPin,
        "2003" => PaymentStatus::TransactionLimitExceeded,
        _ => PaymentStatus::Failed,
    }
}

/// Human-readable text for a status; plain failures keep the gateway's description
pub fn status_message(status: PaymentStatus, description: &str) -> String {
    let fixed = match status {
        PaymentStatus::Pending => "Waiting for the customer to confirm",
        PaymentStatus::Completed => "Payment completed successfully",
        PaymentStatus::InsufficientFunds => "Insufficient funds",
        PaymentStatus::Cancelled => "Cancelled by user",
        PaymentStatus::Timeout => "Request timed out",
        PaymentStatus::WrongPin => "Wrong PIN entered",
        PaymentStatus::TransactionLimitExceeded => "Transaction limit exceeded",
        PaymentStatus::Failed => {
            let description = description.trim();
            return if description.is_empty() {
                "Transaction failed".to_string()
            } else {
                description.to_string()
            };
        }
    };
    fixed.to_string()
}
