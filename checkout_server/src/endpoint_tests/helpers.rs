use actix_web::{
    body::to_bytes,
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use checkout_common::Secret;
use checkout_engine::db_types::Role;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::{
    auth::{JwtClaims, TokenVerifier},
    middleware::IdentityMiddlewareFactory,
};

// DO NOT re-use this secret anywhere.
pub const TEST_JWT_SECRET: &str = "endpoint-test-secret-7c1f0a4e9b2d3c5e8f60";

pub fn issue_token(user_id: i64, roles: Vec<Role>, expiry: DateTime<Utc>) -> String {
    let claims = JwtClaims { sub: user_id.to_string(), roles, exp: expiry.timestamp() };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes())).expect("Failed to sign token")
}

/// Sends `req` through an app that has the identity middleware in front of the routes added by `configure`.
pub async fn authenticated_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let verifier = TokenVerifier::new(&Secret::new(TEST_JWT_SECRET.to_string()));
    let app = App::new().wrap(IdentityMiddlewareFactory::new(verifier)).configure(configure);
    let service = test::init_service(app).await;
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = to_bytes(res.into_body()).await.expect("Could not read error body");
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

/// Sends `req` through an app without any authentication, as the gateway's webhook calls are.
pub async fn public_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}
