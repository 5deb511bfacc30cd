use serde::{Deserialize, Serialize};

/// Lifecycle status of a push payment attempt
///
/// Every variant other than `Pending` is terminal. The failure sub-statuses
/// are kept distinct so the cashier sees why the payment did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
    InsufficientFunds,
    WrongPin,
    Timeout,
    TransactionLimitExceeded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 8] = [
        PaymentStatus::Pending,
        PaymentStatus::Completed,
        PaymentStatus::Failed,
        PaymentStatus::Cancelled,
        PaymentStatus::InsufficientFunds,
        PaymentStatus::WrongPin,
        PaymentStatus::Timeout,
        PaymentStatus::TransactionLimitExceeded,
    ];

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PaymentStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::InsufficientFunds => "insufficient_funds",
            PaymentStatus::WrongPin => "wrong_pin",
            PaymentStatus::Timeout => "timeout",
            PaymentStatus::TransactionLimitExceeded => "transaction_limit_exceeded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid payment status: {}", s))
    }
}

/// Which path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Poll,
    Callback,
    /// Synthesized locally, e.g. a push the gateway refused
    Local,
}

impl ResultSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultSource::Poll => "poll",
            ResultSource::Callback => "callback",
            ResultSource::Local => "local",
        }
    }
}

impl std::fmt::Display for ResultSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResultSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "poll" => Ok(ResultSource::Poll),
            "callback" => Ok(ResultSource::Callback),
            "local" => Ok(ResultSource::Local),
            _ => Err(format!("Invalid result source: {}", s)),
        }
    }
}
