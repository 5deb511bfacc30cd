use super::super::models::{
    PaymentMethod, Transaction, TransactionOutcome, TransactionStatus, TransactionType,
};
use crate::core::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::mysql::MySqlRow;
use sqlx::types::Json;
use sqlx::{MySqlPool, Row};

/// Ledger of transactions consumed by payment reconciliation
///
/// `set_outcome` is conditional: it only moves a `pending` transaction, so
/// concurrent resolutions of the same attempt mutate it at most once.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn append(&self, transaction: &Transaction) -> Result<()>;

    async fn find_by_correlation(&self, correlation_id: &str) -> Result<Option<Transaction>>;

    /// Move a pending transaction to its terminal status
    ///
    /// # Returns
    /// * `Result<bool>` - true if this call performed the transition
    async fn set_outcome(&self, transaction_id: &str, outcome: &TransactionOutcome) -> Result<bool>;
}

/// MySQL-backed transaction ledger
pub struct MySqlTransactionRepository {
    pool: MySqlPool,
}

impl MySqlTransactionRepository {
    /// Create a new MySqlTransactionRepository
    ///
    /// # Arguments
    /// * `pool` - Database connection pool
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, transaction_type, amount, payment_method, status,
        correlation_id, account_reference, customer_id,
        payment_confirmation, failure_reason, created_at, updated_at
    FROM transactions
"#;

fn parse_column<T: std::str::FromStr<Err = String>>(row: &MySqlRow, column: &str) -> Result<T> {
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(AppError::Internal)
}

fn transaction_from_row(row: &MySqlRow) -> Result<Transaction> {
    let transaction_type: TransactionType = parse_column(row, "transaction_type")?;
    let payment_method: PaymentMethod = parse_column(row, "payment_method")?;
    let status: TransactionStatus = parse_column(row, "status")?;
    let confirmation: Option<Json<Value>> = row.try_get("payment_confirmation")?;
    let amount: Decimal = row.try_get("amount")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Transaction {
        id: row.try_get("id")?,
        transaction_type,
        amount,
        payment_method,
        status,
        correlation_id: row.try_get("correlation_id")?,
        account_reference: row.try_get("account_reference")?,
        customer_id: row.try_get("customer_id")?,
        payment_confirmation: confirmation.map(|json| json.0),
        failure_reason: row.try_get("failure_reason")?,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl TransactionStore for MySqlTransactionRepository {
    async fn append(&self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, transaction_type, amount, payment_method, status,
                correlation_id, account_reference, customer_id,
                payment_confirmation, failure_reason, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.id)
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.amount)
        .bind(transaction.payment_method.as_str())
        .bind(transaction.status.as_str())
        .bind(&transaction.correlation_id)
        .bind(&transaction.account_reference)
        .bind(&transaction.customer_id)
        .bind(transaction.payment_confirmation.clone().map(Json))
        .bind(&transaction.failure_reason)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_correlation(&self, correlation_id: &str) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!("{} WHERE correlation_id = ?", SELECT_COLUMNS))
            .bind(correlation_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn set_outcome(&self, transaction_id: &str, outcome: &TransactionOutcome) -> Result<bool> {
        let (confirmation, failure_reason) = match outcome {
            TransactionOutcome::Completed { confirmation } => (Some(Json(confirmation.clone())), None),
            TransactionOutcome::Failed { reason } => (None, Some(reason.clone())),
        };

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = ?, payment_confirmation = ?, failure_reason = ?, updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(outcome.status().as_str())
        .bind(confirmation)
        .bind(failure_reason)
        .bind(Utc::now())
        .bind(transaction_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
