use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Customer with a running debt balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    /// Short code sent as the push account reference
    pub code: String,
    pub name: String,
    pub phone: Option<String>,
    /// Outstanding debt owed to the shop
    pub outstanding_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(code: impl Into<String>, name: impl Into<String>, outstanding_balance: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            code: code.into(),
            name: name.into(),
            phone: None,
            outstanding_balance,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_phone(mut self, phone: Option<String>) -> Self {
        self.phone = phone;
        self
    }
}
