use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use checkout_common::{Money, Secret};
use checkout_engine::{
    db_types::{OrderStatusType, PaymentStatus, Role, Settlement},
    events::EventProducers,
    helpers::calculate_hmac,
    order_objects::PaymentIntent,
    traits::{InsertPaymentResult, SettlementResult},
    GatewayError,
    PaymentReconcilerApi,
};
use chrono::{Days, Utc};
use serde_json::{json, Value};

use super::{
    helpers::{authenticated_request, issue_token, public_request},
    mocks::{order, payment, MockBackend, MockGateway, USER_ID},
};
use crate::routes::{InitiatePaymentRoute, PaymentForOrderRoute, PaymentWebhookRoute};

const WEBHOOK_SECRET: &str = "whsec_endpoint_tests_91aa";

fn api(backend: MockBackend, gateway: MockGateway) -> PaymentReconcilerApi<MockBackend, MockGateway> {
    PaymentReconcilerApi::new(backend, gateway, Secret::new(WEBHOOK_SECRET.to_string()), EventProducers::default())
}

fn configure(backend: MockBackend, gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(InitiatePaymentRoute::<MockBackend, MockGateway>::new())
            .service(PaymentForOrderRoute::<MockBackend, MockGateway>::new())
            .app_data(web::Data::new(api(backend, gateway)));
    }
}

fn configure_webhook(backend: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(PaymentWebhookRoute::<MockBackend, MockGateway>::new())
            .app_data(web::Data::new(api(backend, MockGateway::new())));
    }
}

fn authorized(req: TestRequest) -> TestRequest {
    let token = issue_token(USER_ID, vec![Role::User], Utc::now() + Days::new(1));
    req.insert_header(("Authorization", format!("Bearer {token}")))
}

fn webhook_body(event: &str, external_order_id: &str, reason: Option<&str>) -> Vec<u8> {
    let body = json!({
        "entity": "event",
        "event": event,
        "payload": {"payment": {"entity": {
            "id": "pay_endpoint_1",
            "order_id": external_order_id,
            "amount": 4000,
            "currency": "INR",
            "status": event.trim_start_matches("payment."),
            "error_description": reason,
        }}},
        "created_at": 1_718_000_000
    });
    serde_json::to_vec(&body).unwrap()
}

fn webhook_request(body: Vec<u8>, signature: Option<String>) -> TestRequest {
    let mut req = TestRequest::post().uri("/payments").insert_header(("Content-Type", "application/json"));
    if let Some(signature) = signature {
        req = req.insert_header(("X-Gateway-Signature", signature));
    }
    req.set_payload(body)
}

#[actix_web::test]
async fn initiate_payment() {
    let _ = env_logger::try_init();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_by_id().returning(|id| Ok(Some(order(id, USER_ID, OrderStatusType::Created))));
    backend.expect_fetch_payment_for_order().times(1).returning(|_| Ok(None));
    backend
        .expect_insert_payment_for_order()
        .withf(|p| p.order_id == 11 && p.external_order_id == "order_ext_11" && p.amount == Money::from(4000))
        .times(1)
        .returning(|p| Ok(InsertPaymentResult::Inserted(payment(p.order_id, PaymentStatus::Initiated))));
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_remote_intent()
        .withf(|amount, currency, receipt| *amount == Money::from(4000) && currency == "INR" && receipt == "order_11")
        .times(1)
        .returning(|_, _, _| Ok("order_ext_11".to_string()));
    let req = authorized(TestRequest::post().uri("/orders/11/payment"));
    let (status, body) = authenticated_request(req, configure(backend, gateway)).await;
    assert_eq!(status, StatusCode::OK);
    let intent: PaymentIntent = serde_json::from_str(&body).unwrap();
    assert_eq!(intent.external_order_id, "order_ext_11");
    assert_eq!(intent.amount, Money::from(4000));
    assert_eq!(intent.currency, "INR");
}

#[actix_web::test]
async fn initiate_payment_when_gateway_is_down() {
    let _ = env_logger::try_init();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_by_id().returning(|id| Ok(Some(order(id, USER_ID, OrderStatusType::Created))));
    backend.expect_fetch_payment_for_order().returning(|_| Ok(None));
    backend.expect_insert_payment_for_order().never();
    let mut gateway = MockGateway::new();
    gateway.expect_create_remote_intent().returning(|_, _, _| Err(GatewayError::Unavailable("timed out".into())));
    let req = authorized(TestRequest::post().uri("/orders/11/payment"));
    let (status, _) = authenticated_request(req, configure(backend, gateway)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn initiate_payment_for_paid_order() {
    let _ = env_logger::try_init();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_by_id().returning(|id| Ok(Some(order(id, USER_ID, OrderStatusType::Cancelled))));
    backend.expect_fetch_payment_for_order().returning(|_| Ok(None));
    let mut gateway = MockGateway::new();
    gateway.expect_create_remote_intent().never();
    let req = authorized(TestRequest::post().uri("/orders/11/payment"));
    let (status, _) = authenticated_request(req, configure(backend, gateway)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn payment_for_order_before_initiation() {
    let _ = env_logger::try_init();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_by_id().returning(|id| Ok(Some(order(id, USER_ID, OrderStatusType::Created))));
    backend.expect_fetch_payment_for_order().returning(|_| Ok(None));
    let req = authorized(TestRequest::get().uri("/orders/11/payment"));
    let (status, _) = authenticated_request(req, configure(backend, MockGateway::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn webhook_with_bad_signature_touches_nothing() {
    let _ = env_logger::try_init();
    // Any call on the backend would fail the test
    let backend = MockBackend::new();
    let body = webhook_body("payment.captured", "order_ext_11", None);
    let signature = calculate_hmac("not-the-webhook-secret", &body);
    let (status, body) = public_request(webhook_request(body, Some(signature)), configure_webhook(backend)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("signature"), "{body}");
}

#[actix_web::test]
async fn webhook_without_signature() {
    let _ = env_logger::try_init();
    let body = webhook_body("payment.captured", "order_ext_11", None);
    let (status, _) = public_request(webhook_request(body, None), configure_webhook(MockBackend::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn webhook_with_malformed_body() {
    let _ = env_logger::try_init();
    let body = br#"{"event": "payment.captured", "payload": {}}"#.to_vec();
    let signature = calculate_hmac(WEBHOOK_SECRET, &body);
    let (status, _) = public_request(webhook_request(body, Some(signature)), configure_webhook(MockBackend::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn webhook_capture() {
    let _ = env_logger::try_init();
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_payment_by_external_order_id()
        .withf(|ext| ext == "order_ext_11")
        .returning(|_| Ok(Some(payment(11, PaymentStatus::Initiated))));
    backend.expect_fetch_order_by_id().returning(|id| Ok(Some(order(id, USER_ID, OrderStatusType::PaymentPending))));
    backend
        .expect_settle_payment()
        .withf(|id, s| *id == 111 && *s == Settlement::Captured { external_payment_id: "pay_endpoint_1".into() })
        .times(1)
        .returning(|_, _| {
            Ok(SettlementResult::Applied {
                payment: payment(11, PaymentStatus::Captured),
                order: order(11, USER_ID, OrderStatusType::Paid),
            })
        });
    let body = webhook_body("payment.captured", "order_ext_11", None);
    let signature = calculate_hmac(WEBHOOK_SECRET, &body);
    let (status, body) = public_request(webhook_request(body, Some(signature)), configure_webhook(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let outcome: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(outcome, json!({"outcome": "applied", "order_id": 11, "status": "Paid"}));
}

#[actix_web::test]
async fn webhook_for_unknown_payment() {
    let _ = env_logger::try_init();
    let mut backend = MockBackend::new();
    backend.expect_fetch_payment_by_external_order_id().returning(|_| Ok(None));
    let body = webhook_body("payment.captured", "order_nobody", None);
    let signature = calculate_hmac(WEBHOOK_SECRET, &body);
    let (status, body) = public_request(webhook_request(body, Some(signature)), configure_webhook(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let outcome: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(outcome, json!({"outcome": "unknown_payment", "external_order_id": "order_nobody"}));
}

#[actix_web::test]
async fn webhook_capture_after_failure_is_rejected_with_200() {
    let _ = env_logger::try_init();
    let mut backend = MockBackend::new();
    backend.expect_fetch_payment_by_external_order_id().returning(|_| Ok(Some(payment(11, PaymentStatus::Failed))));
    backend.expect_fetch_payment_for_order().returning(|_| Ok(Some(payment(11, PaymentStatus::Failed))));
    backend.expect_fetch_order_by_id().returning(|id| Ok(Some(order(id, USER_ID, OrderStatusType::PaymentFailed))));
    backend.expect_settle_payment().times(1).returning(|_, _| Ok(SettlementResult::NotApplied));
    let body = webhook_body("payment.captured", "order_ext_11", None);
    let signature = calculate_hmac(WEBHOOK_SECRET, &body);
    let (status, body) = public_request(webhook_request(body, Some(signature)), configure_webhook(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let outcome: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(outcome["outcome"], "rejected");
    assert!(outcome["error"].as_str().unwrap().contains("PaymentFailed"));
}

#[actix_web::test]
async fn ignored_event_type() {
    let _ = env_logger::try_init();
    let body = webhook_body("refund.created", "order_ext_11", None);
    let signature = calculate_hmac(WEBHOOK_SECRET, &body);
    let (status, body) = public_request(webhook_request(body, Some(signature)), configure_webhook(MockBackend::new())).await;
    assert_eq!(status, StatusCode::OK);
    let outcome: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(outcome, json!({"outcome": "ignored", "event": "refund.created"}));
}
