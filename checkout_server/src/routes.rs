//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use std::time::Duration;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use checkout_engine::{
    db_types::Role,
    helpers::CapabilitySigner,
    traits::{
        CartManagement,
        CatalogLookup,
        FileAccessManagement,
        InsertOrderResult,
        OrderManagement,
        PaymentGateway,
        PaymentManagement,
    },
    CheckoutError,
    FileAccessApi,
    OrderLedgerApi,
    PaymentReconcilerApi,
};
use log::*;

use crate::{
    auth::Identity,
    config::ProxyConfig,
    data_objects::{CreateOrderParams, DownloadParams, DownloadResponse, WebhookRejection},
    errors::ServerError,
    helpers::get_remote_ip,
};

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";
pub const GATEWAY_SIGNATURE_HEADER: &str = "X-Gateway-Signature";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
//
// Usage: `route!(handler => Method "/path" impl <B: [TraitA, TraitB], G: [TraitC]> where requires [Role::X])`.
// The `where requires` clause is optional and wraps the resource in the ACL middleware.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl <$($param:ident: [$($bounds:path),+]),+> $(where requires [$($roles:expr),*])?) => {
        paste::paste! { pub struct [<$name:camel Route>]<$($param),+>(core::marker::PhantomData<fn() -> ($($param,)+)>);}
        paste::paste! { impl<$($param),+> [<$name:camel Route>]<$($param),+> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData)
            }
        }}
        paste::paste! { impl<$($param),+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$($param),+>
        where
            $($param: $($bounds +)+ 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<$($param),+>)
                    $(.wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),*])))?;
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl <B: [OrderManagement, CartManagement, CatalogLookup]>);
/// Turns the caller's cart into an order.
///
/// Clients must send an `Idempotency-Key` header. Retrying with the same key returns the original order with
/// `200 OK`, whatever the cart looks like by then. A brand new order is returned with `201 Created`.
pub async fn create_order<B>(
    req: HttpRequest,
    identity: Identity,
    body: web::Json<CreateOrderParams>,
    api: web::Data<OrderLedgerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + CartManagement + CatalogLookup,
{
    let key = req
        .headers()
        .get(IDEMPOTENCY_KEY_HEADER)
        .ok_or(ServerError::MissingHeader(IDEMPOTENCY_KEY_HEADER))?
        .to_str()
        .map_err(|e| ServerError::InvalidRequestBody(format!("{IDEMPOTENCY_KEY_HEADER} is not valid text. {e}")))?;
    let params = body.into_inner();
    debug!("💻️ User {} is checking out cart #{} with key '{key}'", identity.user_id, params.cart_id);
    match api.create_order(identity.user_id, key, params.cart_id, params.address_id).await? {
        InsertOrderResult::Inserted(order) => Ok(HttpResponse::Created().json(order)),
        InsertOrderResult::AlreadyExists(order) => Ok(HttpResponse::Ok().json(order)),
    }
}

route!(my_orders => Get "/orders" impl <B: [OrderManagement, CartManagement, CatalogLookup]>);
/// All of the caller's orders, oldest first.
pub async fn my_orders<B: OrderManagement + CartManagement + CatalogLookup>(
    identity: Identity,
    api: web::Data<OrderLedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET my_orders for user {}", identity.user_id);
    let orders = api.list_orders(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl <B: [OrderManagement, CartManagement, CatalogLookup]>);
/// The order with its frozen lines and address. Someone else's order is reported as missing.
pub async fn order_by_id<B: OrderManagement + CartManagement + CatalogLookup>(
    identity: Identity,
    path: web::Path<i64>,
    api: web::Data<OrderLedgerApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    trace!("💻️ GET order #{order_id} for user {}", identity.user_id);
    let details = api.order_details(order_id, identity.user_id).await?;
    Ok(HttpResponse::Ok().json(details))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(initiate_payment => Post "/orders/{order_id}/payment" impl <B: [OrderManagement, PaymentManagement], G: [PaymentGateway]>);
pub async fn initiate_payment<B, G>(
    identity: Identity,
    path: web::Path<i64>,
    api: web::Data<PaymentReconcilerApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentManagement,
    G: PaymentGateway,
{
    let order_id = path.into_inner();
    debug!("💻️ User {} is starting payment for order #{order_id}", identity.user_id);
    let intent = api.initiate_payment(order_id, identity.user_id).await?;
    Ok(HttpResponse::Ok().json(intent))
}

route!(payment_for_order => Get "/orders/{order_id}/payment" impl <B: [OrderManagement, PaymentManagement], G: [PaymentGateway]>);
pub async fn payment_for_order<B, G>(
    identity: Identity,
    path: web::Path<i64>,
    api: web::Data<PaymentReconcilerApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentManagement,
    G: PaymentGateway,
{
    let order_id = path.into_inner();
    trace!("💻️ GET payment for order #{order_id}");
    let payment = api.payment_for_order(order_id, identity.user_id).await?;
    Ok(HttpResponse::Ok().json(payment))
}

route!(payment_webhook => Post "/payments" impl <B: [OrderManagement, PaymentManagement], G: [PaymentGateway]>);
/// Receives payment events from the gateway.
///
/// The body is taken as raw bytes, since the signature covers the bytes exactly as they were sent. Every verified
/// event gets a `200`, including duplicates, unknown payments, and events that contradict what we have recorded.
/// Only a bad signature (`401`) or a verified but unreadable body (`400`) is refused.
pub async fn payment_webhook<B, G>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<PaymentReconcilerApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentManagement,
    G: PaymentGateway,
{
    trace!("📥️ Received webhook delivery ({} bytes)", body.len());
    let signature = match req.headers().get(GATEWAY_SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) {
        Some(s) => s,
        None => {
            warn!("📥️ Webhook delivery without a {GATEWAY_SIGNATURE_HEADER} header. Rejecting it.");
            return Err(CheckoutError::InvalidSignature.into());
        },
    };
    match api.handle_webhook_event(body.as_ref(), signature).await {
        Ok(outcome) => {
            debug!("📥️ Webhook handled: {outcome:?}");
            Ok(HttpResponse::Ok().json(outcome))
        },
        Err(e @ CheckoutError::InvalidTransition { .. }) => {
            warn!("📥️ Webhook contradicts recorded state. {e}");
            Ok(HttpResponse::Ok().json(WebhookRejection::new(e)))
        },
        Err(e) => Err(e.into()),
    }
}

//----------------------------------------------   Downloads  ----------------------------------------------------
route!(download => Get "/orders/{order_id}/files/{file_id}/download" impl <B: [OrderManagement, FileAccessManagement], S: [CapabilitySigner]>);
/// Hands out a short-lived URL for a file the caller has paid for. Every call is checked afresh and logged.
pub async fn download<B, S>(
    req: HttpRequest,
    identity: Identity,
    path: web::Path<(i64, i64)>,
    query: web::Query<DownloadParams>,
    proxy: web::Data<ProxyConfig>,
    api: web::Data<FileAccessApi<B, S>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + FileAccessManagement,
    S: CapabilitySigner,
{
    let (order_id, file_id) = path.into_inner();
    let ttl = query.ttl.map(Duration::from_secs);
    let remote_ip = get_remote_ip(&req, **proxy).map(|ip| ip.to_string());
    debug!("💻️ User {} wants file #{file_id} of order #{order_id} from {remote_ip:?}", identity.user_id);
    let signed = api.authorize(order_id, file_id, identity.user_id, ttl, remote_ip).await?;
    Ok(HttpResponse::Ok().json(DownloadResponse::from(signed)))
}

route!(access_log => Get "/orders/{order_id}/access_log" impl <B: [OrderManagement, FileAccessManagement], S: [CapabilitySigner]> where requires [Role::ReadAll]);
pub async fn access_log<B, S>(
    path: web::Path<i64>,
    api: web::Data<FileAccessApi<B, S>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + FileAccessManagement,
    S: CapabilitySigner,
{
    let order_id = path.into_inner();
    trace!("💻️ GET access log for order #{order_id}");
    let logs = api.access_logs_for_order(order_id).await?;
    Ok(HttpResponse::Ok().json(logs))
}
