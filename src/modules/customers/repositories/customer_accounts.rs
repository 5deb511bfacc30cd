use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::core::Result;
use crate::modules::customers::models::Customer;

/// Debt book updated when a customer's debt payment completes
#[async_trait]
pub trait CustomerAccounts: Send + Sync {
    /// Create or replace a customer keyed by `code`
    ///
    /// An existing customer keeps its id and creation time; name, phone and
    /// balance are overwritten.
    ///
    /// # Returns
    /// * `Result<Customer>` - the customer as stored
    async fn upsert(&self, customer: &Customer) -> Result<Customer>;

    async fn find(&self, customer_id: &str) -> Result<Option<Customer>>;

    /// Look up by the code a till sends as the push account reference
    async fn find_by_code(&self, code: &str) -> Result<Option<Customer>>;

    /// Reduce the customer's outstanding balance by `amount`
    ///
    /// Keyed by `transaction_id`: repeating a call for a transaction that was
    /// already applied leaves the balance unchanged.
    ///
    /// # Returns
    /// * `Result<Decimal>` - the balance after the payment
    async fn apply_debt_payment(
        &self,
        customer_id: &str,
        amount: Decimal,
        transaction_id: &str,
    ) -> Result<Decimal>;
}
