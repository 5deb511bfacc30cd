use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::modules::transactions::models::PaymentMethod;

/// Direction in which a completed transaction moves the drawer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterEffect {
    Credit,
    Debit,
    /// Adds to the tender total only; goods taken in exchange never reach the drawer
    TenderOnly,
    /// Recorded against the session without touching any total (debts)
    None,
}

/// Running totals per tender
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTotals {
    pub cash: Decimal,
    pub card: Decimal,
    pub mobile: Decimal,
    pub exchange: Decimal,
}

impl PaymentTotals {
    pub fn get(&self, method: PaymentMethod) -> Decimal {
        match method {
            PaymentMethod::Cash => self.cash,
            PaymentMethod::Card => self.card,
            PaymentMethod::Mobile => self.mobile,
            PaymentMethod::Exchange => self.exchange,
        }
    }

    fn slot(&mut self, method: PaymentMethod) -> &mut Decimal {
        match method {
            PaymentMethod::Cash => &mut self.cash,
            PaymentMethod::Card => &mut self.card,
            PaymentMethod::Mobile => &mut self.mobile,
            PaymentMethod::Exchange => &mut self.exchange,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Closed,
}

/// A single ledger outcome handed to the register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOutcome {
    pub transaction_id: String,
    pub payment_method: PaymentMethod,
    pub amount: Decimal,
    pub effect: RegisterEffect,
}

/// Cash-drawer session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSession {
    pub id: String,
    pub opening_balance: Decimal,
    pub expected_balance: Decimal,
    pub closing_balance: Option<Decimal>,
    pub status: SessionStatus,
    pub payment_totals: PaymentTotals,
    /// Transactions recorded against this session, in order
    pub transactions: Vec<String>,
    pub notes: Option<String>,
    /// Counted minus expected, set on close
    pub difference: Option<Decimal>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl RegisterSession {
    pub fn open(opening_balance: Decimal) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            opening_balance,
            expected_balance: opening_balance,
            closing_balance: None,
            status: SessionStatus::Open,
            payment_totals: PaymentTotals::default(),
            transactions: Vec::new(),
            notes: None,
            difference: None,
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// Fold one outcome into the totals
    ///
    /// Credits add to the tender total and the expected balance, debits
    /// subtract from both.
    pub fn apply(&mut self, outcome: &RegisterOutcome) {
        let amount = outcome.amount.abs();
        let (method_delta, balance_delta) = match outcome.effect {
            RegisterEffect::None => (Decimal::ZERO, Decimal::ZERO),
            RegisterEffect::Credit => (amount, amount),
            RegisterEffect::TenderOnly => (amount, Decimal::ZERO),
            RegisterEffect::Debit => (-amount, -amount),
        };

        *self.payment_totals.slot(outcome.payment_method) += method_delta;
        self.expected_balance += balance_delta;
        self.transactions.push(outcome.transaction_id.clone());
    }

    pub fn close(&mut self, closing_balance: Decimal, notes: Option<String>) {
        self.status = SessionStatus::Closed;
        self.closing_balance = Some(closing_balance);
        self.difference = Some(closing_balance - self.expected_balance);
        self.notes = notes;
        self.closed_at = Some(Utc::now());
    }
}

/// Notifications published to register observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegisterEvent {
    Opened { session_id: String },
    OutcomeRecorded { session_id: String, outcome: RegisterOutcome },
    Closed { session_id: String, difference: Decimal },
}
