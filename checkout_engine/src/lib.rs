//! Checkout Engine
//!
//! The checkout engine is the order-and-payment reconciliation core of an e-commerce checkout. It turns carts into
//! immutable orders, coordinates payment with an external gateway through asynchronous webhooks, and hands out
//! short-lived download capabilities for paid digital files.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). You should never need to access the database directly.
//!    Instead, use the public API provided by the engine. The exception is the data types used in the database. These
//!    are defined in the `db_types` module and are public.
//! 2. The engine's public API ([`mod@checkout_api`]). Backends need to implement the traits in [`mod@traits`] in order
//!    to act as a backend for an API.
//!
//! The engine also provides a set of events that can be subscribed to. These are emitted after the state change they
//! describe has been committed. For example, when a payment is captured, an `OrderPaidEvent` is emitted.
//! A simple Actor framework is used so that you can easily hook into these events and perform custom actions, such
//! as issuing an invoice.
pub mod checkout_api;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use checkout_api::{
    errors::{CheckoutError, GatewayError, PricingError},
    file_access_api::FileAccessApi,
    order_ledger_api::OrderLedgerApi,
    order_objects,
    pricing::{PriceSnapshot, PriceSnapshotResolver},
    reconciler_api::PaymentReconcilerApi,
    webhook_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
