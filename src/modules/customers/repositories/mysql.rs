use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

use super::customer_accounts::CustomerAccounts;
use crate::core::{AppError, Result};
use crate::modules::customers::models::Customer;

/// MySQL-backed debt book
///
/// `customer_debt_payments` is keyed by transaction id; a debt payment only
/// moves the balance when its row is newly inserted, under a row lock on
/// the customer.
pub struct MySqlCustomerAccounts {
    pool: MySqlPool,
}

impl MySqlCustomerAccounts {
    /// Create a new MySqlCustomerAccounts
    ///
    /// # Arguments
    /// * `pool` - Database connection pool
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, code, name, phone, outstanding_balance, created_at, updated_at
    FROM customers
"#;

fn customer_from_row(row: &MySqlRow) -> Result<Customer> {
    let outstanding_balance: Decimal = row.try_get("outstanding_balance")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Customer {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        outstanding_balance,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl CustomerAccounts for MySqlCustomerAccounts {
    async fn upsert(&self, customer: &Customer) -> Result<Customer> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, code, name, phone, outstanding_balance, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                name = VALUES(name),
                phone = VALUES(phone),
                outstanding_balance = VALUES(outstanding_balance),
                updated_at = VALUES(updated_at)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.code)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.outstanding_balance)
        .bind(customer.created_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.find_by_code(&customer.code)
            .await?
            .ok_or_else(|| AppError::internal(format!("Customer {} not stored", customer.code)))
    }

    async fn find(&self, customer_id: &str) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(customer_from_row).transpose()
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Customer>> {
        let row = sqlx::query(&format!("{} WHERE code = ?", SELECT_COLUMNS))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(customer_from_row).transpose()
    }

    async fn apply_debt_payment(
        &self,
        customer_id: &str,
        amount: Decimal,
        transaction_id: &str,
    ) -> Result<Decimal> {
        let mut tx = self.pool.begin().await?;

        let balance: Option<Decimal> =
            sqlx::query_scalar("SELECT outstanding_balance FROM customers WHERE id = ? FOR UPDATE")
                .bind(customer_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(balance) = balance else {
            return Err(AppError::not_found(format!("Customer {}", customer_id)));
        };

        let inserted = sqlx::query(
            r#"
            INSERT IGNORE INTO customer_debt_payments (transaction_id, customer_id, amount, applied_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(transaction_id)
        .bind(customer_id)
        .bind(amount)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.commit().await?;
            return Ok(balance);
        }

        let balance = balance - amount;
        sqlx::query("UPDATE customers SET outstanding_balance = ?, updated_at = ? WHERE id = ?")
            .bind(balance)
            .bind(Utc::now())
            .bind(customer_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

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
