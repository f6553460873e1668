use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use checkout_common::Money;
use checkout_engine::{
    db_types::{Address, Cart, CartLine, Material, Order, OrderStatusType, Product, Role},
    events::EventProducers,
    order_objects::OrderDetails,
    traits::InsertOrderResult,
    CheckoutError,
    OrderLedgerApi,
};
use chrono::{Days, Utc};
use serde_json::json;

use super::{
    helpers::{authenticated_request, issue_token},
    mocks::{order, MockBackend, OTHER_USER_ID, USER_ID},
};
use crate::{
    helpers::{json_config, path_config},
    routes::{CreateOrderRoute, MyOrdersRoute, OrderByIdRoute},
};

fn valid_token(user_id: i64) -> String {
    issue_token(user_id, vec![Role::User], Utc::now() + Days::new(1))
}

fn configure(backend: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = OrderLedgerApi::new(backend, EventProducers::default());
        cfg.service(CreateOrderRoute::<MockBackend>::new())
            .service(MyOrdersRoute::<MockBackend>::new())
            .service(OrderByIdRoute::<MockBackend>::new())
            .app_data(web::Data::new(api))
            .app_data(path_config())
            .app_data(json_config());
    }
}

fn create_order_request(token: &str, key: Option<&str>) -> TestRequest {
    let mut req = TestRequest::post()
        .uri("/orders")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(json!({"cart_id": 3, "address_id": 5}));
    if let Some(key) = key {
        req = req.insert_header(("Idempotency-Key", key));
    }
    req
}

/// A backend holding a cart (2 x 1500 + 500) owned by `cart_owner` and an address owned by `address_owner`.
fn backend_with_cart(cart_owner: i64, address_owner: i64) -> MockBackend {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_by_idempotency_key().returning(|_, _| Ok(None));
    backend.expect_fetch_cart().returning(move |id| Ok(Some(Cart { id, user_id: cart_owner })));
    backend.expect_fetch_cart_lines().returning(|cart_id| {
        Ok(vec![CartLine { id: 1, cart_id, product_id: 1, material_id: 2, quantity: 2 }])
    });
    backend.expect_fetch_product().returning(|id| {
        Ok(Some(Product { id, name: "Field Guide (print)".into(), base_price: Money::from(1500), is_active: true }))
    });
    backend.expect_fetch_material().returning(|id| {
        Ok(Some(Material { id, name: "Hardcover".into(), price: Money::from(500), is_active: true }))
    });
    backend.expect_fetch_address().returning(move |id| {
        Ok(Some(Address {
            id,
            user_id: address_owner,
            recipient: "Asha Rao".into(),
            line1: "12 MG Road".into(),
            line2: None,
            city: "Bengaluru".into(),
            region: Some("KA".into()),
            postal_code: "560001".into(),
            country: "IN".into(),
        }))
    });
    backend
}

#[actix_web::test]
async fn create_order_without_token() {
    let _ = env_logger::try_init();
    let req = TestRequest::post().uri("/orders").insert_header(("Idempotency-Key", "k1")).set_json(json!({}));
    let (status, body) = authenticated_request(req, configure(MockBackend::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No bearer token"), "{body}");
}

#[actix_web::test]
async fn create_order_with_expired_token() {
    let _ = env_logger::try_init();
    let token = issue_token(USER_ID, vec![Role::User], Utc::now() - Days::new(1));
    let req = create_order_request(&token, Some("k1"));
    let (status, _) = authenticated_request(req, configure(MockBackend::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn create_order_requires_idempotency_key() {
    let _ = env_logger::try_init();
    let req = create_order_request(&valid_token(USER_ID), None);
    let (status, body) = authenticated_request(req, configure(MockBackend::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Idempotency-Key"), "{body}");
}

#[actix_web::test]
async fn create_order_freezes_cart() {
    let _ = env_logger::try_init();
    let mut backend = backend_with_cart(USER_ID, USER_ID);
    backend
        .expect_insert_order_from_cart()
        .withf(|o| {
            o.user_id == USER_ID &&
                o.idempotency_key == "k1" &&
                o.cart_line_ids == vec![1] &&
                o.total == Money::from(4000) &&
                o.lines.len() == 1 &&
                o.address.recipient == "Asha Rao"
        })
        .times(1)
        .returning(|_| Ok(InsertOrderResult::Inserted(order(11, USER_ID, OrderStatusType::Created))));
    let req = create_order_request(&valid_token(USER_ID), Some("k1"));
    let (status, body) = authenticated_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::CREATED);
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(order.id, 11);
    assert_eq!(order.total, Money::from(4000));
    assert_eq!(order.status, OrderStatusType::Created);
}

#[actix_web::test]
async fn retried_create_order_returns_original() {
    let _ = env_logger::try_init();
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_order_by_idempotency_key()
        .withf(|user_id, key| *user_id == USER_ID && key == "k1")
        .returning(|_, _| Ok(Some(order(11, USER_ID, OrderStatusType::PaymentPending))));
    let req = create_order_request(&valid_token(USER_ID), Some("k1"));
    let (status, body) = authenticated_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(order.id, 11);
    assert_eq!(order.status, OrderStatusType::PaymentPending);
}

#[actix_web::test]
async fn create_order_that_loses_the_race_returns_the_winner() {
    let _ = env_logger::try_init();
    // The key was free when this request looked, but a concurrent retry committed first
    let mut backend = backend_with_cart(USER_ID, USER_ID);
    backend
        .expect_insert_order_from_cart()
        .times(1)
        .returning(|_| Ok(InsertOrderResult::AlreadyExists(order(11, USER_ID, OrderStatusType::Created))));
    let req = create_order_request(&valid_token(USER_ID), Some("k1"));
    let (status, body) = authenticated_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(order.id, 11);
}

#[actix_web::test]
async fn create_order_while_the_cart_keeps_changing() {
    let _ = env_logger::try_init();
    let mut backend = backend_with_cart(USER_ID, USER_ID);
    backend.expect_insert_order_from_cart().times(3).returning(|_| Err(CheckoutError::CartChanged));
    let req = create_order_request(&valid_token(USER_ID), Some("k1"));
    let (status, body) = authenticated_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("The cart changed"), "{body}");
}

#[actix_web::test]
async fn create_order_with_malformed_body() {
    let _ = env_logger::try_init();
    let req = TestRequest::post()
        .uri("/orders")
        .insert_header(("Authorization", format!("Bearer {}", valid_token(USER_ID))))
        .insert_header(("Idempotency-Key", "k1"))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"cart_id\": \"three\"}");
    let (status, body) = authenticated_request(req, configure(MockBackend::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Could not read request body"), "{body}");
}

#[actix_web::test]
async fn create_order_from_empty_cart() {
    let _ = env_logger::try_init();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_by_idempotency_key().returning(|_, _| Ok(None));
    backend.expect_fetch_cart().returning(|id| Ok(Some(Cart { id, user_id: USER_ID })));
    backend.expect_fetch_cart_lines().returning(|_| Ok(vec![]));
    let req = create_order_request(&valid_token(USER_ID), Some("k1"));
    let (status, body) = authenticated_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("The cart is empty"), "{body}");
}

#[actix_web::test]
async fn create_order_with_someone_elses_address() {
    let _ = env_logger::try_init();
    let mut backend = backend_with_cart(USER_ID, OTHER_USER_ID);
    backend.expect_insert_order_from_cart().never();
    let req = create_order_request(&valid_token(USER_ID), Some("k1"));
    let (status, _) = authenticated_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn create_order_from_someone_elses_cart() {
    let _ = env_logger::try_init();
    let mut backend = backend_with_cart(OTHER_USER_ID, USER_ID);
    backend.expect_insert_order_from_cart().never();
    let req = create_order_request(&valid_token(USER_ID), Some("k1"));
    let (status, _) = authenticated_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn my_orders() {
    let _ = env_logger::try_init();
    let mut backend = MockBackend::new();
    backend.expect_fetch_orders_for_user().withf(|id| *id == USER_ID).returning(|user_id| {
        Ok(vec![order(1, user_id, OrderStatusType::Paid), order(2, user_id, OrderStatusType::Created)])
    });
    let req = TestRequest::get().uri("/orders").insert_header(("Authorization", format!("Bearer {}", valid_token(USER_ID))));
    let (status, body) = authenticated_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<Order> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.iter().map(|o| o.id).collect::<Vec<_>>(), vec![1, 2]);
}

#[actix_web::test]
async fn order_details() {
    let _ = env_logger::try_init();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_by_id().returning(|id| Ok(Some(order(id, USER_ID, OrderStatusType::Created))));
    backend.expect_fetch_order_lines().returning(|_| Ok(vec![]));
    backend.expect_fetch_order_address().returning(|_| Ok(None));
    let req = TestRequest::get().uri("/orders/11").insert_header(("Authorization", format!("Bearer {}", valid_token(USER_ID))));
    let (status, body) = authenticated_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let details: OrderDetails = serde_json::from_str(&body).unwrap();
    assert_eq!(details.order.id, 11);
}

#[actix_web::test]
async fn someone_elses_order_is_not_found() {
    let _ = env_logger::try_init();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_by_id().returning(|id| Ok(Some(order(id, USER_ID, OrderStatusType::Paid))));
    let token = valid_token(OTHER_USER_ID);
    let req = TestRequest::get().uri("/orders/11").insert_header(("Authorization", format!("Bearer {token}")));
    let (status, body) = authenticated_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("does not exist"), "{body}");
}

#[actix_web::test]
async fn order_id_must_be_numeric() {
    let _ = env_logger::try_init();
    let req = TestRequest::get().uri("/orders/abc").insert_header(("Authorization", format!("Bearer {}", valid_token(USER_ID))));
    let (status, body) = authenticated_request(req, configure(MockBackend::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Could not read request path"), "{body}");
}
