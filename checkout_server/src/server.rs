use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use checkout_engine::{
    events::EventProducers,
    helpers::HmacUrlSigner,
    FileAccessApi,
    OrderLedgerApi,
    PaymentReconcilerApi,
    SqliteDatabase,
};
use gateway_tools::GatewayApi;
use log::*;

use crate::{
    auth::TokenVerifier,
    config::ServerConfig,
    errors::ServerError,
    helpers::{json_config, path_config},
    hooks::checkout_event_handlers,
    integrations::GatewayAdapter,
    middleware::IdentityMiddlewareFactory,
    routes::{
        health,
        AccessLogRoute,
        CreateOrderRoute,
        DownloadRoute,
        InitiatePaymentRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        PaymentForOrderRoute,
        PaymentWebhookRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not run migrations. {e}")))?;
    info!("🗃️ Database ready at {}", db.url());
    let gateway = GatewayApi::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = checkout_event_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, GatewayAdapter::new(gateway), producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: GatewayAdapter,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let verifier = TokenVerifier::new(&config.auth.jwt_secret);
    info!("💻️ Starting checkout server on {}:{}", config.host, config.port);
    let srv = HttpServer::new(move || {
        let ledger_api = OrderLedgerApi::new(db.clone(), producers.clone()).with_currency(config.currency.clone());
        let reconciler_api =
            PaymentReconcilerApi::new(db.clone(), gateway.clone(), config.webhook_secret.clone(), producers.clone());
        let signer = HmacUrlSigner::new(config.storage.base_url.clone(), config.storage.signing_key.clone());
        let file_api = FileAccessApi::new(db.clone(), signer).with_default_ttl(config.download_ttl);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("chk::access_log"))
            .app_data(web::Data::new(ledger_api))
            .app_data(web::Data::new(reconciler_api))
            .app_data(web::Data::new(file_api))
            .app_data(web::Data::new(config.proxy))
            .app_data(path_config())
            .app_data(json_config());
        // Routes that require authentication
        let auth_scope = web::scope("/api")
            .wrap(IdentityMiddlewareFactory::new(verifier.clone()))
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(InitiatePaymentRoute::<SqliteDatabase, GatewayAdapter>::new())
            .service(PaymentForOrderRoute::<SqliteDatabase, GatewayAdapter>::new())
            .service(DownloadRoute::<SqliteDatabase, HmacUrlSigner>::new())
            .service(AccessLogRoute::<SqliteDatabase, HmacUrlSigner>::new());
        // The gateway authenticates with a body signature, not a bearer token
        let webhook_scope = web::scope("/webhook").service(PaymentWebhookRoute::<SqliteDatabase, GatewayAdapter>::new());
        app.service(health).service(auth_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
