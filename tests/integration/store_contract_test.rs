// Store contract tests
//
// Every scenario runs against the in-memory stores and, when
// TEST_DATABASE_URL is set, against the MySQL stores on a migrated test
// database:
// 1. First terminal result wins, later ones are audit only
// 2. Concurrent results have exactly one winner
// 3. A result that arrives before its request is adopted
// 4. Ledger outcomes are written once
// 5. Debt payments apply once per transaction

#[path = "../helpers/mod.rs"]
mod helpers;

use chrono::Utc;
use rust_decimal_macros::dec;
use serde_json::json;
use std::collections::BTreeMap;

use helpers::*;
use tillpay::core::AppError;
use tillpay::customers::Customer;
use tillpay::payments::{PaymentRequest, PaymentResult, PaymentStatus, ResolveAttempt, ResultSource};
use tillpay::transactions::{Transaction, TransactionOutcome, TransactionStatus, TransactionType};

fn request(correlation_id: &str) -> PaymentRequest {
    PaymentRequest {
        correlation_id: correlation_id.to_string(),
        merchant_request_id: format!("MR-{}", correlation_id),
        payer_reference: TEST_MSISDN.to_string(),
        amount: dec!(1234.50),
        account_reference: "SALE-0001".to_string(),
        description: "Sale".to_string(),
        created_at: Utc::now(),
    }
}

fn result(correlation_id: &str, code: &str, source: ResultSource) -> PaymentResult {
    let mut metadata = BTreeMap::new();
    if code == "0" {
        metadata.insert("MpesaReceiptNumber".to_string(), json!(TEST_RECEIPT));
        metadata.insert("Amount".to_string(), json!(1234.5));
    }

    PaymentResult::from_gateway(
        correlation_id,
        code,
        format!("Result {}", code),
        source,
        json!({ "ResultCode": code }),
    )
    .with_metadata(metadata)
}

#[tokio::test]
async fn test_first_terminal_result_wins() {
    for (backend, stores) in store_backends().await {
        let correlation_id = unique_id("ws_CO");
        let adopted = stores.payments.insert_pending(&request(&correlation_id)).await.unwrap();
        assert!(adopted.is_none(), "{}: nothing to adopt", backend);

        let pending = stores.payments.find(&correlation_id).await.unwrap().unwrap();
        assert_eq!(pending.status, PaymentStatus::Pending, "{}", backend);
        assert_eq!(pending.request.amount, dec!(1234.50), "{}", backend);

        match stores
            .payments
            .record_result(&result(&correlation_id, "0", ResultSource::Poll))
            .await
            .unwrap()
        {
            ResolveAttempt::Transitioned(record) => {
                assert_eq!(record.status, PaymentStatus::Completed, "{}", backend);
                assert!(!record.ledger_applied, "{}", backend);
            }
            other => panic!("{}: first result should transition, got {:?}", backend, other),
        }

        match stores
            .payments
            .record_result(&result(&correlation_id, "1032", ResultSource::Callback))
            .await
            .unwrap()
        {
            ResolveAttempt::AlreadyResolved(record) => {
                assert_eq!(record.status, PaymentStatus::Completed, "{}", backend);
            }
            other => panic!("{}: late result should be audit only, got {:?}", backend, other),
        }

        let record = stores.payments.find(&correlation_id).await.unwrap().unwrap();
        let resolution = record.resolution.expect("resolution stored");
        assert_eq!(resolution.result_code, "0", "{}", backend);
        assert_eq!(resolution.source, ResultSource::Poll, "{}", backend);
        assert_eq!(resolution.receipt_number().as_deref(), Some(TEST_RECEIPT), "{}", backend);
        assert!(record.resolved_at.is_some(), "{}", backend);

        let history = stores.payments.history(&correlation_id).await.unwrap();
        let codes: Vec<&str> = history.iter().map(|r| r.result_code.as_str()).collect();
        assert_eq!(codes, vec!["0", "1032"], "{}", backend);

        stores.payments.mark_ledger_applied(&correlation_id).await.unwrap();
        let record = stores.payments.find(&correlation_id).await.unwrap().unwrap();
        assert!(record.ledger_applied, "{}", backend);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_results_have_one_winner() {
    for (backend, stores) in store_backends().await {
        let correlation_id = unique_id("ws_CO");
        stores.payments.insert_pending(&request(&correlation_id)).await.unwrap();

        let mut handles = Vec::new();
        for attempt in 0..8 {
            let payments = stores.payments.clone();
            let (code, source) = if attempt % 2 == 0 {
                ("0", ResultSource::Poll)
            } else {
                ("1032", ResultSource::Callback)
            };
            let offered = result(&correlation_id, code, source);
            handles.push(tokio::spawn(async move { payments.record_result(&offered).await }));
        }

        let mut winners = Vec::new();
        for handle in handles {
            if let ResolveAttempt::Transitioned(record) = handle.await.unwrap().unwrap() {
                winners.push(record);
            }
        }
        assert_eq!(winners.len(), 1, "{}: exactly one result transitions", backend);

        let record = stores.payments.find(&correlation_id).await.unwrap().unwrap();
        assert_eq!(record.status, winners[0].status, "{}", backend);
        assert_eq!(
            stores.payments.history(&correlation_id).await.unwrap().len(),
            8,
            "{}",
            backend
        );
    }
}

#[tokio::test]
async fn test_result_before_request_is_adopted() {
    for (backend, stores) in store_backends().await {
        let correlation_id = unique_id("ws_CO");

        let early = stores
            .payments
            .record_result(&result(&correlation_id, "1032", ResultSource::Callback))
            .await
            .unwrap();
        assert_eq!(early, ResolveAttempt::Unknown, "{}", backend);
        assert!(stores.payments.find(&correlation_id).await.unwrap().is_none(), "{}", backend);

        let adopted = stores
            .payments
            .insert_pending(&request(&correlation_id))
            .await
            .unwrap()
            .expect("orphan result adopted");
        assert_eq!(adopted.result_code, "1032", "{}", backend);

        let record = stores.payments.find(&correlation_id).await.unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Cancelled, "{}", backend);
        assert_eq!(
            stores.payments.history(&correlation_id).await.unwrap().len(),
            1,
            "{}",
            backend
        );

        let late = stores
            .payments
            .record_result(&result(&correlation_id, "0", ResultSource::Poll))
            .await
            .unwrap();
        assert!(matches!(late, ResolveAttempt::AlreadyResolved(_)), "{}", backend);
    }
}

#[tokio::test]
async fn test_transaction_outcome_is_written_once() {
    for (backend, stores) in store_backends().await {
        let correlation_id = unique_id("ws_CO");
        let transaction = Transaction::pending_mobile(
            TransactionType::Sale,
            dec!(999.99),
            correlation_id.clone(),
            "SALE-0001".to_string(),
            None,
        )
        .unwrap();
        stores.transactions.append(&transaction).await.unwrap();

        let confirmation = json!({ "receiptNumber": TEST_RECEIPT, "resultCode": "0" });
        let completed = stores
            .transactions
            .set_outcome(
                &transaction.id,
                &TransactionOutcome::Completed { confirmation: confirmation.clone() },
            )
            .await
            .unwrap();
        assert!(completed, "{}: pending transaction moves", backend);

        let failed = stores
            .transactions
            .set_outcome(
                &transaction.id,
                &TransactionOutcome::Failed { reason: "Request cancelled by user".to_string() },
            )
            .await
            .unwrap();
        assert!(!failed, "{}: terminal transaction stays put", backend);

        let stored = stores
            .transactions
            .find_by_correlation(&correlation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, transaction.id, "{}", backend);
        assert_eq!(stored.status, TransactionStatus::Completed, "{}", backend);
        assert_eq!(stored.amount, dec!(999.99), "{}", backend);
        assert_eq!(stored.payment_confirmation, Some(confirmation), "{}", backend);
        assert!(stored.failure_reason.is_none(), "{}", backend);

        assert!(stores
            .transactions
            .find_by_correlation(&unique_id("ws_CO"))
            .await
            .unwrap()
            .is_none());
    }
}

#[tokio::test]
async fn test_debt_payment_applies_once() {
    for (backend, stores) in store_backends().await {
        let code = unique_id("CUST");
        let first = stores
            .customers
            .upsert(&Customer::new(&code, "Wanjiku", dec!(1200)))
            .await
            .unwrap();
        let updated = stores
            .customers
            .upsert(&Customer::new(&code, "Jane Wanjiku", dec!(1000)))
            .await
            .unwrap();
        assert_eq!(updated.id, first.id, "{}: upsert by code keeps the id", backend);
        assert_eq!(updated.name, "Jane Wanjiku", "{}", backend);

        let transaction_id = uuid::Uuid::new_v4().to_string();
        let balance = stores
            .customers
            .apply_debt_payment(&first.id, dec!(250.50), &transaction_id)
            .await
            .unwrap();
        assert_eq!(balance, dec!(749.50), "{}", backend);

        let again = stores
            .customers
            .apply_debt_payment(&first.id, dec!(250.50), &transaction_id)
            .await
            .unwrap();
        assert_eq!(again, dec!(749.50), "{}: replay leaves the balance", backend);

        let stored = stores.customers.find(&first.id).await.unwrap().unwrap();
        assert_eq!(stored.outstanding_balance, dec!(749.50), "{}", backend);

        let err = stores
            .customers
            .apply_debt_payment(&unique_id("missing"), dec!(1), &uuid::Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)), "{}", backend);
    }
}
