use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::core::{AppError, Result};

/// Smallest amount the gateway accepts for a push payment (KES 1)
pub const MINIMUM_PUSH_AMOUNT: Decimal = Decimal::ONE;

/// Validates that an amount may be collected through a push payment
pub fn validate_push_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::validation("Amount must be a positive number"));
    }

    if amount < MINIMUM_PUSH_AMOUNT {
        return Err(AppError::validation("Minimum amount is KES 1"));
    }

    Ok(())
}

/// Converts an amount to the whole-shilling integer the gateway expects.
///
/// Halves round away from zero, matching how the POS rounds the push amount.
pub fn to_gateway_units(amount: Decimal) -> Result<u64> {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or_else(|| AppError::validation(format!("Amount {} cannot be sent to the gateway", amount)))
}

/// Formats an amount for display, e.g. `KES 500.00`
pub fn format_kes(amount: Decimal) -> String {
    format!("KES {:.2}", amount.round_dp(2))
}
