// Test Data Builders
//
// Builds payment requests and gateway callback bodies the way the
// till and the gateway send them.

use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::time::Duration;

use tillpay::config::PollingConfig;
use tillpay::payments::StartPayment;
use tillpay::transactions::TransactionType;

pub const TEST_PHONE: &str = "0712345678";
pub const TEST_MSISDN: &str = "254712345678";
pub const TEST_RECEIPT: &str = "NLJ7RT61SV";

/// A sale paid by push from the test phone
pub fn sale(amount: i64) -> StartPayment {
    StartPayment {
        payer_reference: TEST_PHONE.to_string(),
        amount: Decimal::from(amount),
        account_reference: "SALE-0001".to_string(),
        description: None,
        transaction_type: TransactionType::Sale,
        customer_id: None,
    }
}

/// A debt payment settling part of `customer_id`'s balance
pub fn debt_payment(amount: i64, customer_id: &str) -> StartPayment {
    StartPayment {
        payer_reference: TEST_PHONE.to_string(),
        amount: Decimal::from(amount),
        account_reference: "CUST0001".to_string(),
        description: Some("Debt Payment".to_string()),
        transaction_type: TransactionType::Payment,
        customer_id: Some(customer_id.to_string()),
    }
}

/// A debt payment identified only by the customer code sent as account reference
pub fn debt_payment_by_code(amount: i64, customer_code: &str) -> StartPayment {
    StartPayment {
        payer_reference: TEST_PHONE.to_string(),
        amount: Decimal::from(amount),
        account_reference: customer_code.to_string(),
        description: Some("Debt Payment".to_string()),
        transaction_type: TransactionType::Payment,
        customer_id: None,
    }
}

/// Successful callback carrying a receipt number
pub fn success_callback(correlation_id: &str, amount: i64) -> Value {
    json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": format!("MR-{}", correlation_id),
                "CheckoutRequestID": correlation_id,
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        { "Name": "Amount", "Value": amount },
                        { "Name": "MpesaReceiptNumber", "Value": TEST_RECEIPT },
                        { "Name": "TransactionDate", "Value": 20250101123045u64 },
                        { "Name": "PhoneNumber", "Value": 254712345678u64 }
                    ]
                }
            }
        }
    })
}

/// Failed callback without metadata
pub fn failure_callback(correlation_id: &str, code: i64, description: &str) -> Value {
    json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": format!("MR-{}", correlation_id),
                "CheckoutRequestID": correlation_id,
                "ResultCode": code,
                "ResultDesc": description
            }
        }
    })
}

/// Callback as raw bytes, as the endpoint receives it
pub fn callback_bytes(body: &Value) -> Vec<u8> {
    serde_json::to_vec(body).unwrap()
}

/// Real-time polling policy for background reconciliation over HTTP
pub fn fast_polling() -> PollingConfig {
    PollingConfig {
        max_attempts: 20,
        interval: Duration::from_millis(20),
    }
}

/// Polling policy short enough for paused-clock tests
pub fn quick_polling(max_attempts: u32) -> PollingConfig {
    PollingConfig {
        max_attempts,
        interval: Duration::from_secs(5),
    }
}
