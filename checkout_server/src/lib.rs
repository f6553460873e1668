//! # Checkout server
//! This module hosts the HTTP surface of the checkout engine. It is responsible for:
//! * Authenticating callers (bearer JWTs issued elsewhere) and enforcing per-route roles.
//! * Translating requests into calls on the engine APIs, and engine errors into HTTP status codes.
//! * Receiving payment gateway webhooks, byte-for-byte, so that their signatures can be verified.
//! * Wiring the post-commit event hooks (invoices, customer notifications).
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/orders`: `POST` converts a cart into an order (requires an `Idempotency-Key` header); `GET` lists the
//!   caller's orders.
//! * `/api/orders/{id}`: The caller's order, with its line items and shipping address.
//! * `/api/orders/{id}/payment`: `POST` starts payment for the order; `GET` returns the payment once started.
//! * `/api/orders/{id}/files/{file_id}/download`: Issues a short-lived download URL for a paid file.
//! * `/api/orders/{id}/access_log`: The download audit trail for an order. Requires the `ReadAll` role.
//! * `/webhook/payments`: Payment gateway webhooks.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod hooks;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
