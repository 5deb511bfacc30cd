// Property test for poll/callback reconciliation races
//
// Runs the polling path and the callback path for the same attempt on a
// multi-threaded runtime with randomized interleaving, then checks that the
// ledger and register were mutated exactly once.

#[path = "../helpers/mod.rs"]
mod helpers;

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

use helpers::*;
use tillpay::payments::{PaymentStatus, StartOutcome};
use tillpay::transactions::TransactionStatus;
use tillpay::AppServices;

const RESULT_CODES: [&str; 5] = ["0", "1", "1032", "1037", "2001"];

async fn yield_times(n: u8) {
    for _ in 0..n {
        tokio::task::yield_now().await;
    }
}

struct RaceOutcome {
    status: PaymentStatus,
    transaction_status: TransactionStatus,
    mobile_total: Decimal,
    recorded_transactions: usize,
    history_len: usize,
}

async fn race(poll_code: &str, callback_code: i64, amount: i64, poll_delay: u8, callback_delay: u8) -> RaceOutcome {
    let gateway = Arc::new(ScriptedGateway::accepting("ws_CO_RACE"));
    gateway.query_answer(QueryScript::result(poll_code, "poll answer"));
    let services = AppServices::in_memory(gateway);
    services.register.open_session(Decimal::ZERO).unwrap();

    let correlation_id = match services.orchestrator.start(sale(amount)).await.unwrap() {
        StartOutcome::Pending { correlation_id, .. } => correlation_id,
        StartOutcome::Failed(failure) => panic!("push should be accepted: {:?}", failure),
    };

    let callback_body = if callback_code == 0 {
        success_callback(&correlation_id, amount)
    } else {
        failure_callback(&correlation_id, callback_code, "callback answer")
    };

    let poller = {
        let orchestrator = services.orchestrator.clone();
        let correlation_id = correlation_id.clone();
        tokio::spawn(async move {
            yield_times(poll_delay).await;
            orchestrator.poll(&correlation_id).await
        })
    };
    let callback = {
        let receiver = services.callbacks.clone();
        let body = callback_bytes(&callback_body);
        tokio::spawn(async move {
            yield_times(callback_delay).await;
            receiver.handle(&body).await
        })
    };

    poller.await.unwrap().unwrap();
    callback.await.unwrap();

    let record = services.payments.find(&correlation_id).await.unwrap().unwrap();
    let transaction = services
        .transactions
        .find_by_correlation(&correlation_id)
        .await
        .unwrap()
        .unwrap();
    let session = services.register.current().unwrap().unwrap();

    RaceOutcome {
        status: record.status,
        transaction_status: transaction.status,
        mobile_total: session
            .payment_totals
            .get(tillpay::transactions::PaymentMethod::Mobile),
        recorded_transactions: session.transactions.len(),
        history_len: services.payments.history(&correlation_id).await.unwrap().len(),
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_same_success_from_both_paths_applies_once(
        amount in 1i64..100_000,
        poll_delay in 0u8..8,
        callback_delay in 0u8..8,
    ) {
        let outcome = runtime().block_on(race("0", 0, amount, poll_delay, callback_delay));

        prop_assert_eq!(outcome.status, PaymentStatus::Completed);
        prop_assert_eq!(outcome.transaction_status, TransactionStatus::Completed);
        prop_assert_eq!(outcome.mobile_total, Decimal::from(amount));
        prop_assert_eq!(outcome.recorded_transactions, 1);
        // The poll skips the gateway when the callback already won
        prop_assert!((1..=2).contains(&outcome.history_len));
    }

    #[test]
    fn test_conflicting_results_have_one_winner(
        poll_code in prop::sample::select(RESULT_CODES.to_vec()),
        callback_code in prop::sample::select(vec![0i64, 1, 1032, 1037, 2001]),
        poll_delay in 0u8..8,
        callback_delay in 0u8..8,
    ) {
        let outcome = runtime().block_on(race(poll_code, callback_code, 500, poll_delay, callback_delay));

        prop_assert!(outcome.status.is_terminal());

        let winner_succeeded = outcome.status.is_success();
        prop_assert_eq!(
            outcome.transaction_status,
            if winner_succeeded { TransactionStatus::Completed } else { TransactionStatus::Failed }
        );
        prop_assert_eq!(
            outcome.mobile_total,
            if winner_succeeded { Decimal::from(500) } else { Decimal::ZERO }
        );
        prop_assert_eq!(outcome.recorded_transactions, usize::from(winner_succeeded));
        prop_assert!(outcome.history_len >= 1);
    }
}
