//! Parsing of the gateway's STK callback body.
//!
//! The body is untrusted: any shape is accepted by the endpoint, and only a
//! body carrying a correlation id and a result code becomes a
//! [`PaymentResult`]. Everything else is reported as a [`CallbackParseError`]
//! for the caller to log.

use serde_json::Value;
use std::collections::BTreeMap;

use super::{PaymentResult, ResultSource};
use crate::modules::gateways::models::daraja_wire::code_to_string;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackParseError {
    #[error("callback body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("callback body has no Body.stkCallback object")]
    MissingEnvelope,

    #[error("callback is missing {0}")]
    MissingField(&'static str),
}

/// Parse a raw callback body into a callback-sourced result
pub fn parse_stk_callback(body: &[u8]) -> Result<PaymentResult, CallbackParseError> {
    let raw: Value = serde_json::from_slice(body)
        .map_err(|e| CallbackParseError::InvalidJson(e.to_string()))?;
    parse_stk_callback_value(raw)
}

pub fn parse_stk_callback_value(raw: Value) -> Result<PaymentResult, CallbackParseError> {
    let callback = raw
        .get("Body")
        .and_then(|body| body.get("stkCallback"))
        .filter(|cb| cb.is_object())
        .ok_or(CallbackParseError::MissingEnvelope)?;

    let correlation_id = callback
        .get("CheckoutRequestID")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(CallbackParseError::MissingField("CheckoutRequestID"))?
        .to_string();

    let result_code = callback
        .get("ResultCode")
        .and_then(code_to_string)
        .ok_or(CallbackParseError::MissingField("ResultCode"))?;

    let result_description = callback
        .get("ResultDesc")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let merchant_request_id = callback
        .get("MerchantRequestID")
        .and_then(Value::as_str)
        .map(str::to_string);

    let metadata = flatten_metadata(callback.get("CallbackMetadata"));

    Ok(PaymentResult::from_gateway(
        correlation_id,
        result_code,
        result_description,
        ResultSource::Callback,
        raw.clone(),
    )
    .with_merchant_request_id(merchant_request_id)
    .with_metadata(metadata))
}

/// `CallbackMetadata.Item[{Name, Value}]` into a flat map; malformed items are skipped
fn flatten_metadata(metadata: Option<&Value>) -> BTreeMap<String, Value> {
    metadata
        .and_then(|m| m.get("Item"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let name = item.get("Name")?.as_str()?;
                    let value = item.get("Value").cloned().unwrap_or(Value::Null);
                    Some((name.to_string(), value))
                })
                .collect()
        })
        .unwrap_or_default()
}
