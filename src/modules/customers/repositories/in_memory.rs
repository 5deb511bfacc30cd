use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::customer_accounts::CustomerAccounts;
use crate::core::{AppError, Result};
use crate::modules::customers::models::Customer;

#[derive(Default)]
struct Book {
    customers: HashMap<String, Customer>,
    by_code: HashMap<String, String>,
    applied: HashSet<String>,
}

/// Process-local debt book used when no database is configured
#[derive(Default)]
pub struct InMemoryCustomerAccounts {
    book: Mutex<Book>,
}

impl InMemoryCustomerAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Book>> {
        self.book
            .lock()
            .map_err(|_| AppError::internal("customer book lock poisoned"))
    }
}

#[async_trait]
impl CustomerAccounts for InMemoryCustomerAccounts {
    async fn upsert(&self, customer: &Customer) -> Result<Customer> {
        let mut book = self.lock()?;

        let mut stored = customer.clone();
        if let Some(existing) = book
            .by_code
            .get(&customer.code)
            .and_then(|id| book.customers.get(id))
        {
            stored.id = existing.id.clone();
            stored.created_at = existing.created_at;
        }
        stored.updated_at = Utc::now();

        book.by_code.insert(stored.code.clone(), stored.id.clone());
        book.customers.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn find(&self, customer_id: &str) -> Result<Option<Customer>> {
        Ok(self.lock()?.customers.get(customer_id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Customer>> {
        let book = self.lock()?;
        Ok(book
            .by_code
            .get(code)
            .and_then(|id| book.customers.get(id))
            .cloned())
    }

    async fn apply_debt_payment(
        &self,
        customer_id: &str,
        amount: Decimal,
        transaction_id: &str,
    ) -> Result<Decimal> {
        let mut book = self.lock()?;

        let already_applied = book.applied.contains(transaction_id);
        let customer = book
            .customers
            .get_mut(customer_id)
            .ok_or_else(|| AppError::not_found(format!("Customer {}", customer_id)))?;

        if already_applied {
            return Ok(customer.outstanding_balance);
        }

        customer.outstanding_balance -= amount;
        customer.updated_at = Utc::now();
        let balance = customer.outstanding_balance;
        book.applied.insert(transaction_id.to_string());

        tracing::info!(
            customer_id = %customer_id,
            transaction_id = %transaction_id,
            amount = %amount,
            balance = %balance,
            "Customer debt reduced"
        );
        Ok(balance)
    }
}
