// Integration tests for polling budgets and the cashier-facing flow
//
// Uses a paused clock so the 5 second poll interval costs nothing:
// - exhausting the attempt budget leaves the attempt pending
// - a late callback still resolves it
// - a callback wakes a waiting poller early
// - the flow controller reports each terminal state

#[path = "../helpers/mod.rs"]
mod helpers;

use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use helpers::*;
use tillpay::payments::services::NOT_CONFIRMED_MESSAGE;
use tillpay::payments::{
    AwaitOutcome, FlowState, PaymentFlow, PaymentStatus, ResultSource, StartOutcome,
};
use tillpay::transactions::TransactionStatus;
use tillpay::AppServices;

async fn started(services: &AppServices) -> String {
    match services.orchestrator.start(sale(500)).await.unwrap() {
        StartOutcome::Pending { correlation_id, .. } => correlation_id,
        StartOutcome::Failed(failure) => panic!("push should be accepted: {:?}", failure),
    }
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_polling_leaves_attempt_pending() {
    let gateway = Arc::new(ScriptedGateway::accepting("ws_CO_SLOW"));
    let services = test_services(gateway.clone());
    services.register.open_session(dec!(0)).unwrap();

    let correlation_id = started(&services).await;
    let outcome = services
        .orchestrator
        .await_resolution(&correlation_id, quick_polling(3))
        .await;

    assert_eq!(outcome, AwaitOutcome::NotConfirmed { attempts: 3 });
    assert_eq!(gateway.query_calls(), 3);

    let record = services.payments.find(&correlation_id).await.unwrap().unwrap();
    assert_eq!(record.status, PaymentStatus::Pending);
    let transaction = services
        .transactions
        .find_by_correlation(&correlation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transaction.status, TransactionStatus::Pending);

    // The payer confirms after the till gave up
    services
        .callbacks
        .handle(&callback_bytes(&success_callback(&correlation_id, 500)))
        .await;

    let record = services.payments.find(&correlation_id).await.unwrap().unwrap();
    assert_eq!(record.status, PaymentStatus::Completed);
    assert_register_mobile(&services.register, dec!(500), dec!(500));
}

#[tokio::test(start_paused = true)]
async fn test_query_errors_count_as_attempts() {
    let gateway = Arc::new(ScriptedGateway::accepting("ws_CO_FLAKY"));
    gateway.query_answer(QueryScript::Unavailable);
    gateway.query_answer(QueryScript::Unavailable);
    gateway.query_answer(QueryScript::result("0", "The service request is processed successfully."));
    let services = test_services(gateway.clone());

    let correlation_id = started(&services).await;
    let outcome = services
        .orchestrator
        .await_resolution(&correlation_id, quick_polling(3))
        .await;

    match outcome {
        AwaitOutcome::Resolved(result) => assert_eq!(result.status, PaymentStatus::Completed),
        other => panic!("third attempt should resolve, got {:?}", other),
    }
    assert_eq!(gateway.query_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_callback_wakes_waiting_poller() {
    let gateway = Arc::new(ScriptedGateway::accepting("ws_CO_WAKE"));
    let services = test_services(gateway.clone());
    let correlation_id = started(&services).await;

    let started_at = tokio::time::Instant::now();
    let waiter = {
        let orchestrator = services.orchestrator.clone();
        let correlation_id = correlation_id.clone();
        tokio::spawn(async move {
            orchestrator
                .await_resolution(&correlation_id, quick_polling(10))
                .await
        })
    };
    // Let the waiter subscribe before the callback lands
    tokio::task::yield_now().await;

    services
        .callbacks
        .handle(&callback_bytes(&success_callback(&correlation_id, 500)))
        .await;

    match waiter.await.unwrap() {
        AwaitOutcome::Resolved(result) => {
            assert_eq!(result.source, ResultSource::Callback);
            assert_eq!(result.receipt_number().as_deref(), Some(TEST_RECEIPT));
        }
        other => panic!("callback should resolve the wait, got {:?}", other),
    }
    assert!(started_at.elapsed() < Duration::from_secs(5));
    assert_eq!(gateway.query_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_flow_reports_success() {
    let gateway = Arc::new(ScriptedGateway::accepting("ws_CO_FLOW_OK"));
    gateway.query_answer(QueryScript::StillProcessing);
    gateway.query_answer(QueryScript::result("0", "The service request is processed successfully."));
    let services = test_services(gateway);

    let flow = PaymentFlow::new(services.orchestrator.clone(), quick_polling(5));
    let mut states = flow.watch();
    assert_eq!(*states.borrow_and_update(), FlowState::Idle);

    let state = flow.run(sale(500)).await;

    assert_eq!(
        state,
        FlowState::Succeeded {
            correlation_id: "ws_CO_FLOW_OK".to_string(),
            message: "Payment completed successfully".to_string(),
            receipt_number: None,
        }
    );
    assert_eq!(flow.state(), state);
    assert!(states.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_flow_reports_failure_reason() {
    let gateway = Arc::new(ScriptedGateway::accepting("ws_CO_FLOW_PIN"));
    gateway.query_answer(QueryScript::result("2002", "The initiator information is invalid."));
    let services = test_services(gateway);

    let flow = PaymentFlow::new(services.orchestrator.clone(), quick_polling(5));
    let state = flow.run(sale(500)).await;

    assert_eq!(
        state,
        FlowState::Failed {
            correlation_id: Some("ws_CO_FLOW_PIN".to_string()),
            status: PaymentStatus::WrongPin,
            message: "Wrong PIN entered".to_string(),
            result_code: Some("2002".to_string()),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_flow_reports_local_timeout_as_unconfirmed() {
    let gateway = Arc::new(ScriptedGateway::accepting("ws_CO_FLOW_SLOW"));
    let services = test_services(gateway.clone());

    let flow = PaymentFlow::new(services.orchestrator.clone(), quick_polling(2));
    let state = flow.run(sale(500)).await;

    assert_eq!(
        state,
        FlowState::Failed {
            correlation_id: Some("ws_CO_FLOW_SLOW".to_string()),
            status: PaymentStatus::Pending,
            message: NOT_CONFIRMED_MESSAGE.to_string(),
            result_code: None,
        }
    );
    let record = services.payments.find("ws_CO_FLOW_SLOW").await.unwrap().unwrap();
    assert_eq!(record.status, PaymentStatus::Pending);
}

#[tokio::test(start_paused = true)]
async fn test_flow_reports_refused_push_without_polling() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.push_answer(PushScript::Reject {
        description: "Invalid Access Token".to_string(),
        code: Some("404.001.03".to_string()),
    });
    let services = test_services(gateway.clone());

    let flow = PaymentFlow::new(services.orchestrator.clone(), quick_polling(5));
    let state = flow.run(sale(500)).await;

    assert_eq!(
        state,
        FlowState::Failed {
            correlation_id: None,
            status: PaymentStatus::Failed,
            message: "Invalid Access Token".to_string(),
            result_code: None,
        }
    );
    assert_eq!(gateway.query_calls(), 0);
}
