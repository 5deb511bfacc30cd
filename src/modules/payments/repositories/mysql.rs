use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::mysql::MySqlRow;
use sqlx::types::Json;
use sqlx::{MySqlConnection, MySqlPool, Row};
use std::collections::BTreeMap;

use super::payment_store::{PaymentStore, ResolveAttempt};
use crate::core::{AppError, Result};
use crate::modules::payments::models::{
    PaymentRecord, PaymentRequest, PaymentResult, PaymentStatus, ResultSource,
};

/// MySQL-backed result cache
///
/// `payment_results` is an append-only audit trail. The `pending ->
/// terminal` step is a conditional `UPDATE ... WHERE status = 'pending'`
/// inside the same transaction as the audit insert; the row lock taken by
/// the update serializes concurrent results for one correlation id.
pub struct MySqlPaymentStore {
    pool: MySqlPool,
}

impl MySqlPaymentStore {
    /// Create a new MySqlPaymentStore
    ///
    /// # Arguments
    /// * `pool` - Database connection pool
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

const RESULT_COLUMNS: &str = r#"
    SELECT
        id, correlation_id, merchant_request_id, result_code, result_description,
        status, metadata, raw_payload, source, received_at
    FROM payment_results
"#;

fn parse_column<T: std::str::FromStr<Err = String>>(row: &MySqlRow, column: &str) -> Result<T> {
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(AppError::Internal)
}

fn result_from_row(row: &MySqlRow) -> Result<PaymentResult> {
    let status: PaymentStatus = parse_column(row, "status")?;
    let source: ResultSource = parse_column(row, "source")?;
    let metadata: Json<BTreeMap<String, Value>> = row.try_get("metadata")?;
    let raw_payload: Json<Value> = row.try_get("raw_payload")?;
    let received_at: DateTime<Utc> = row.try_get("received_at")?;

    Ok(PaymentResult {
        correlation_id: row.try_get("correlation_id")?,
        merchant_request_id: row.try_get("merchant_request_id")?,
        result_code: row.try_get("result_code")?,
        result_description: row.try_get("result_description")?,
        status,
        metadata: metadata.0,
        raw_payload: raw_payload.0,
        source,
        received_at,
    })
}

async fn insert_result(conn: &mut MySqlConnection, result: &PaymentResult) -> Result<u64> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO payment_results (
            correlation_id, merchant_request_id, result_code, result_description,
            status, metadata, raw_payload, source, received_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&result.correlation_id)
    .bind(&result.merchant_request_id)
    .bind(&result.result_code)
    .bind(&result.result_description)
    .bind(result.status.as_str())
    .bind(Json(&result.metadata))
    .bind(Json(&result.raw_payload))
    .bind(result.source.as_str())
    .bind(result.received_at)
    .execute(&mut *conn)
    .await?;

    Ok(inserted.last_insert_id())
}

/// Point the request at `result_id` if it is still pending
async fn try_transition(
    conn: &mut MySqlConnection,
    correlation_id: &str,
    status: PaymentStatus,
    result_id: u64,
) -> Result<bool> {
    let updated = sqlx::query(
        r#"
        UPDATE payment_requests
        SET status = ?, resolution_result_id = ?, ledger_applied = FALSE, resolved_at = ?
        WHERE correlation_id = ? AND status = 'pending'
        "#,
    )
    .bind(status.as_str())
    .bind(result_id)
    .bind(Utc::now())
    .bind(correlation_id)
    .execute(&mut *conn)
    .await?;

    Ok(updated.rows_affected() == 1)
}

async fn fetch_record(conn: &mut MySqlConnection, correlation_id: &str) -> Result<Option<PaymentRecord>> {
    let row = sqlx::query(
        r#"
        SELECT
            correlation_id, merchant_request_id, payer_reference, amount,
            account_reference, description, created_at,
            status, resolution_result_id, ledger_applied, resolved_at
        FROM payment_requests
        WHERE correlation_id = ?
        "#,
    )
    .bind(correlation_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let amount: Decimal = row.try_get("amount")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let request = PaymentRequest {
        correlation_id: row.try_get("correlation_id")?,
        merchant_request_id: row.try_get("merchant_request_id")?,
        payer_reference: row.try_get("payer_reference")?,
        amount,
        account_reference: row.try_get("account_reference")?,
        description: row.try_get("description")?,
        created_at,
    };

    let resolution_id: Option<u64> = row.try_get("resolution_result_id")?;
    let resolution = match resolution_id {
        Some(id) => sqlx::query(&format!("{} WHERE id = ?", RESULT_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .as_ref()
            .map(result_from_row)
            .transpose()?,
        None => None,
    };

    Ok(Some(PaymentRecord {
        request,
        status: parse_column(&row, "status")?,
        resolution,
        ledger_applied: row.try_get("ledger_applied")?,
        resolved_at: row.try_get("resolved_at")?,
    }))
}

#[async_trait]
impl PaymentStore for MySqlPaymentStore {
    async fn insert_pending(&self, request: &PaymentRequest) -> Result<Option<PaymentResult>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO payment_requests (
                correlation_id, merchant_request_id, payer_reference, amount,
                account_reference, description, created_at, status, ledger_applied
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', FALSE)
            "#,
        )
        .bind(&request.correlation_id)
        .bind(&request.merchant_request_id)
        .bind(&request.payer_reference)
        .bind(request.amount)
        .bind(&request.account_reference)
        .bind(&request.description)
        .bind(request.created_at)
        .execute(&mut *tx)
        .await?;

        // Locking read so a callback committing concurrently is either seen
        // here or finds the request pending afterwards
        let orphan = sqlx::query(&format!(
            "{} WHERE correlation_id = ? AND status <> 'pending' ORDER BY id LIMIT 1 FOR UPDATE",
            RESULT_COLUMNS
        ))
        .bind(&request.correlation_id)
        .fetch_optional(&mut *tx)
        .await?;

        let adopted = match orphan {
            Some(row) => {
                let result_id: u64 = row.try_get("id")?;
                let result = result_from_row(&row)?;
                try_transition(&mut *tx, &request.correlation_id, result.status, result_id).await?;
                Some(result)
            }
            None => None,
        };

        tx.commit().await?;
        Ok(adopted)
    }

    async fn find(&self, correlation_id: &str) -> Result<Option<PaymentRecord>> {
        let mut conn = self.pool.acquire().await?;
        fetch_record(&mut *conn, correlation_id).await
    }

    async fn record_result(&self, result: &PaymentResult) -> Result<ResolveAttempt> {
        let mut tx = self.pool.begin().await?;

        let result_id = insert_result(&mut *tx, result).await?;
        let transitioned = result.status.is_terminal()
            && try_transition(&mut *tx, &result.correlation_id, result.status, result_id).await?;

        let record = fetch_record(&mut *tx, &result.correlation_id).await?;
        tx.commit().await?;

        Ok(match (record, transitioned) {
            (None, _) => ResolveAttempt::Unknown,
            (Some(record), true) => ResolveAttempt::Transitioned(record),
            (Some(record), false) => ResolveAttempt::AlreadyResolved(record),
        })
    }

    async fn mark_ledger_applied(&self, correlation_id: &str) -> Result<()> {
        // Zero affected rows also covers a concurrent settle that got here first
        sqlx::query("UPDATE payment_requests SET ledger_applied = TRUE WHERE correlation_id = ?")
            .bind(correlation_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn history(&self, correlation_id: &str) -> Result<Vec<PaymentResult>> {
        let rows = sqlx::query(&format!("{} WHERE correlation_id = ? ORDER BY id", RESULT_COLUMNS))
            .bind(correlation_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(result_from_row).collect()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
