use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use checkout_common::{Money, Secret};
use checkout_engine::{
    db_types::{DigitalFile, FileAccessLog, OrderLine, OrderStatusType, Role},
    helpers::HmacUrlSigner,
    FileAccessApi,
};
use chrono::{Days, Utc};
use serde_json::Value;

use super::{
    helpers::{authenticated_request, issue_token},
    mocks::{order, MockBackend, USER_ID},
};
use crate::{
    config::ProxyConfig,
    data_objects::DownloadResponse,
    routes::{AccessLogRoute, DownloadRoute},
};

const FILE_HOST: &str = "https://files.example.com";

fn configure(backend: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let signer = HmacUrlSigner::new(FILE_HOST, Secret::new("storage-signing-key".to_string()));
        let api = FileAccessApi::new(backend, signer);
        cfg.service(DownloadRoute::<MockBackend, HmacUrlSigner>::new())
            .service(AccessLogRoute::<MockBackend, HmacUrlSigner>::new())
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(ProxyConfig::default()));
    }
}

fn request(uri: &str, roles: Vec<Role>) -> TestRequest {
    let token = issue_token(USER_ID, roles, Utc::now() + Days::new(1));
    TestRequest::get()
        .uri(uri)
        .peer_addr(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10)), 40000))
        .insert_header(("Authorization", format!("Bearer {token}")))
}

fn order_line(order_id: i64, product_id: i64) -> OrderLine {
    OrderLine {
        id: 1,
        order_id,
        product_id,
        material_id: 2,
        product_name: "Field Guide (print)".into(),
        base_price: Money::from(1500),
        material_price: Money::from(500),
        unit_price: Money::from(2000),
        quantity: 2,
        line_total: Money::from(4000),
    }
}

fn backend_for(status: OrderStatusType) -> MockBackend {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_by_id().returning(move |id| Ok(Some(order(id, USER_ID, status))));
    backend.expect_fetch_file().returning(|id| {
        Ok(Some(DigitalFile {
            id,
            product_id: 1,
            storage_key: "guides/field-guide.pdf".into(),
            file_name: "field-guide.pdf".into(),
        }))
    });
    backend.expect_fetch_order_lines().returning(|order_id| Ok(vec![order_line(order_id, 1)]));
    backend
}

#[actix_web::test]
async fn download_paid_file() {
    let _ = env_logger::try_init();
    let mut backend = backend_for(OrderStatusType::Paid);
    backend
        .expect_insert_access_log()
        .withf(|e| {
            e.user_id == USER_ID && e.order_id == 11 && e.file_id == 9 && e.requester_address.as_deref() == Some("192.0.2.10")
        })
        .times(1)
        .returning(|e| {
            Ok(FileAccessLog {
                id: 1,
                user_id: e.user_id,
                order_id: e.order_id,
                file_id: e.file_id,
                requester_address: e.requester_address,
                accessed_at: Utc::now(),
            })
        });
    let (status, body) = authenticated_request(request("/orders/11/files/9/download?ttl=60", vec![Role::User]), configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let response: DownloadResponse = serde_json::from_str(&body).unwrap();
    assert!(response.url.starts_with("https://files.example.com/guides/field-guide.pdf?expires="), "{}", response.url);
    assert!(response.url.contains("&signature="));
    assert_eq!(response.expires_in, 60);
}

#[actix_web::test]
async fn download_ttl_is_capped() {
    let _ = env_logger::try_init();
    let mut backend = backend_for(OrderStatusType::Paid);
    backend.expect_insert_access_log().times(1).returning(|e| {
        Ok(FileAccessLog {
            id: 1,
            user_id: e.user_id,
            order_id: e.order_id,
            file_id: e.file_id,
            requester_address: e.requester_address,
            accessed_at: Utc::now(),
        })
    });
    let uri = "/orders/11/files/9/download?ttl=86400";
    let (status, body) = authenticated_request(request(uri, vec![Role::User]), configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let response: DownloadResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.expires_in, 300);
}

#[actix_web::test]
async fn download_before_payment() {
    let _ = env_logger::try_init();
    let mut backend = backend_for(OrderStatusType::PaymentPending);
    backend.expect_insert_access_log().never();
    let uri = "/orders/11/files/9/download";
    let (status, _) = authenticated_request(request(uri, vec![Role::User]), configure(backend)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn download_file_from_another_product() {
    let _ = env_logger::try_init();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_by_id().returning(|id| Ok(Some(order(id, USER_ID, OrderStatusType::Paid))));
    backend.expect_fetch_file().returning(|id| {
        Ok(Some(DigitalFile { id, product_id: 99, storage_key: "other.pdf".into(), file_name: "other.pdf".into() }))
    });
    backend.expect_fetch_order_lines().returning(|order_id| Ok(vec![order_line(order_id, 1)]));
    backend.expect_insert_access_log().never();
    let uri = "/orders/11/files/9/download";
    let (status, _) = authenticated_request(request(uri, vec![Role::User]), configure(backend)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn access_log_requires_read_all() {
    let _ = env_logger::try_init();
    let mut backend = MockBackend::new();
    backend.expect_fetch_access_logs_for_order().never();
    let (status, _) = authenticated_request(request("/orders/11/access_log", vec![Role::User]), configure(backend)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn access_log_for_back_office() {
    let _ = env_logger::try_init();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_by_id().returning(|id| Ok(Some(order(id, 42, OrderStatusType::Paid))));
    backend.expect_fetch_access_logs_for_order().returning(|order_id| {
        Ok(vec![FileAccessLog {
            id: 1,
            user_id: 42,
            order_id,
            file_id: 9,
            requester_address: Some("192.0.2.10".into()),
            accessed_at: Utc::now(),
        }])
    });
    let req = request("/orders/11/access_log", vec![Role::User, Role::ReadAll]);
    let (status, body) = authenticated_request(req, configure(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let logs: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(logs.as_array().map(Vec::len), Some(1));
    assert_eq!(logs[0]["file_id"], 9);
}
