use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Mutex;
use tokio::sync::broadcast;

use crate::core::{AppError, Result};
use crate::modules::register::models::{RegisterEvent, RegisterOutcome, RegisterSession};

const EVENT_CAPACITY: usize = 64;

/// Narrow mutation contract the payment core uses to move register totals
#[async_trait]
pub trait CashRegister: Send + Sync {
    /// Fold a resolved transaction into the open session
    ///
    /// Fails with `AppError::RegisterClosed` when no session is open.
    async fn record_outcome(&self, outcome: &RegisterOutcome) -> Result<RegisterSession>;
}

#[derive(Default)]
struct RegisterState {
    current: Option<RegisterSession>,
    previous: Vec<RegisterSession>,
}

/// Cash-drawer sessions with a notification channel for observers
pub struct RegisterService {
    state: Mutex<RegisterState>,
    events: broadcast::Sender<RegisterEvent>,
}

impl Default for RegisterService {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterService {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(RegisterState::default()),
            events,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, RegisterState>> {
        self.state
            .lock()
            .map_err(|_| AppError::internal("register state lock poisoned"))
    }

    /// Observe register changes; lagging receivers skip old events
    pub fn subscribe(&self) -> broadcast::Receiver<RegisterEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: RegisterEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }

    pub fn open_session(&self, opening_balance: Decimal) -> Result<RegisterSession> {
        if opening_balance < Decimal::ZERO {
            return Err(AppError::validation("Opening balance cannot be negative"));
        }

        let session = {
            let mut state = self.lock()?;
            if state.current.is_some() {
                return Err(AppError::validation("A register session is already open"));
            }
            let session = RegisterSession::open(opening_balance);
            state.current = Some(session.clone());
            session
        };

        tracing::info!(session_id = %session.id, opening_balance = %opening_balance, "Register opened");
        self.publish(RegisterEvent::Opened {
            session_id: session.id.clone(),
        });
        Ok(session)
    }

    pub fn close_session(
        &self,
        closing_balance: Decimal,
        notes: Option<String>,
    ) -> Result<RegisterSession> {
        let session = {
            let mut state = self.lock()?;
            let mut session = state
                .current
                .take()
                .ok_or_else(|| AppError::RegisterClosed("no open session to close".to_string()))?;
            session.close(closing_balance, notes);
            state.previous.insert(0, session.clone());
            session
        };

        let difference = session.difference.unwrap_or_default();
        tracing::info!(session_id = %session.id, difference = %difference, "Register closed");
        self.publish(RegisterEvent::Closed {
            session_id: session.id.clone(),
            difference,
        });
        Ok(session)
    }

    pub fn current(&self) -> Result<Option<RegisterSession>> {
        Ok(self.lock()?.current.clone())
    }

    /// Closed sessions, most recent first
    pub fn previous_sessions(&self) -> Result<Vec<RegisterSession>> {
        Ok(self.lock()?.previous.clone())
    }
}

#[async_trait]
impl CashRegister for RegisterService {
    async fn record_outcome(&self, outcome: &RegisterOutcome) -> Result<RegisterSession> {
        let session = {
            let mut state = self.lock()?;
            let session = state.current.as_mut().ok_or_else(|| {
                AppError::RegisterClosed(format!(
                    "cannot record transaction {}",
                    outcome.transaction_id
                ))
            })?;
            session.apply(outcome);
            session.clone()
        };

        tracing::debug!(
            session_id = %session.id,
            transaction_id = %outcome.transaction_id,
            payment_method = %outcome.payment_method,
            amount = %outcome.amount,
            "Register outcome recorded"
        );
        self.publish(RegisterEvent::OutcomeRecorded {
            session_id: session.id.clone(),
            outcome: outcome.clone(),
        });
        Ok(session)
    }
}
