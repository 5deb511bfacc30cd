//! Payer phone-number normalization for the mobile-money gateway.
//!
//! Accepted inputs are the local form `0XXXXXXXXX`, the international form
//! `254XXXXXXXXX` and `+254XXXXXXXXX`. The canonical form sent to the gateway is
//! `254` followed by nine digits, the first of which is `1` or `7`.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::{AppError, Result};

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\+254|254|0)([17]\d{8})$").expect("phone pattern is a valid regex")
});

/// Normalize a payer phone number to `254XXXXXXXXX`
pub fn normalize_msisdn(raw: &str) -> Result<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    PHONE_PATTERN
        .captures(&compact)
        .and_then(|caps| caps.get(1))
        .map(|subscriber| format!("254{}", subscriber.as_str()))
        .ok_or_else(|| {
            AppError::validation(
                "Invalid phone number format. Use format: +254XXXXXXXXX, 254XXXXXXXXX, or 07XXXXXXXX",
            )
        })
}

/// Mask all but the last three digits, for logs
pub fn mask_msisdn(msisdn: &str) -> String {
    let visible = msisdn.len().saturating_sub(3);
    format!("{}{}", "*".repeat(visible), &msisdn[visible..])
}
