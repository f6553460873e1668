//! # Storage and integration contracts
//!
//! This module defines the interfaces that the checkout core needs from the outside world. Database backends implement
//! the repository traits; the payment gateway integration implements [`PaymentGateway`]; object storage implements
//! [`CapabilitySigner`](crate::helpers::CapabilitySigner).
//!
//! ## Traits
//!
//! * [`CatalogLookup`] is the read-only view of the product catalog that the price resolver needs.
//! * [`CartManagement`] loads carts, their lines, and saved addresses.
//! * [`OrderManagement`] reads orders and writes them. The write methods are each a single atomic unit of work.
//! * [`PaymentManagement`] reads payments and applies gateway results to a payment and its order together.
//! * [`FileAccessManagement`] looks up downloadable files and appends to the access audit trail.
//! * [`PaymentGateway`] is the boundary to the external payment provider.
//!
//! Multi-entity writes (order + lines + address + cart, payment + order status) live behind a single trait method so
//! that the backend can wrap them in one transaction. Callers never see a partially-applied write.
mod cart_management;
mod catalog;
mod data_objects;
mod file_access_management;
mod order_management;
mod payment_gateway;
mod payment_management;

pub use cart_management::CartManagement;
pub use catalog::CatalogLookup;
pub use data_objects::{InsertOrderResult, InsertPaymentResult, SettlementResult};
pub use file_access_management::FileAccessManagement;
pub use order_management::OrderManagement;
pub use payment_gateway::PaymentGateway;
pub use payment_management::PaymentManagement;
