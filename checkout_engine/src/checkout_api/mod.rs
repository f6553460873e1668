//! # Checkout engine public API
//!
//! The `checkout_api` module exposes the programmatic API for the checkout engine. The API is split by component so
//! that callers only need a backend that implements the traits that component uses.
//!
//! * [`pricing`] freezes current catalog prices into order line snapshots. It has no side effects.
//! * [`order_ledger_api`] turns carts into orders, exactly once per idempotency key, and owns the order state
//!   machine.
//! * [`reconciler_api`] starts payments at the gateway and applies verified gateway webhooks to payments and orders.
//! * [`file_access_api`] hands out short-lived download capabilities for paid digital files, and keeps the audit
//!   trail of every capability issued.
//!
//! The other submodules in this module are support types.
//!
//! # API usage
//!
//! The pattern for using all the APIs is the same. An API instance is created by supplying a database backend that
//! implements the specific backend traits required by the API.
//!
//! ```rust,ignore
//! use checkout_engine::{events::EventProducers, OrderLedgerApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/checkout.db", 25).await?;
//! // SqliteDatabase implements OrderManagement, CartManagement and CatalogLookup
//! let api = OrderLedgerApi::new(db, EventProducers::default());
//! let order = api.create_order(user_id, "checkout-3f2a", cart_id, address_id).await?.into_order();
//! ```
pub mod errors;
pub mod file_access_api;
pub mod order_ledger_api;
pub mod order_objects;
pub mod pricing;
pub mod reconciler_api;
pub mod webhook_objects;
