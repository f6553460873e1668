use checkout_common::MoneyOverflowError;
use thiserror::Error;

use crate::db_types::OrderStatusType;

/// Errors raised while freezing cart prices into order lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("Cart line {line_id} refers to a {kind} ({id}) that is missing or no longer for sale")]
    StaleReference { line_id: i64, kind: &'static str, id: i64 },
    #[error("Cart line {line_id} has an invalid quantity ({quantity})")]
    InvalidQuantity { line_id: i64, quantity: i64 },
    #[error("Price computation overflowed. {0}")]
    Overflow(#[from] MoneyOverflowError),
    #[error("Could not look up catalog data. {0}")]
    CatalogUnavailable(String),
}

/// Raised by implementations of [`crate::traits::PaymentGateway`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("The payment gateway could not be reached. {0}")]
    Unavailable(String),
    #[error("The payment gateway rejected the request. {0}")]
    Rejected(String),
}

/// The error taxonomy of the checkout core.
///
/// `NotFound` deliberately covers both "does not exist" and "belongs to someone else". Callers must not be able to
/// tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("Invalid request. {0}")]
    Validation(String),
    #[error("The requested {0} does not exist")]
    NotFound(&'static str),
    #[error("Access to the {0} is forbidden")]
    Forbidden(&'static str),
    #[error("The cart is empty")]
    EmptyCart,
    #[error("The cart changed while the order was being placed")]
    CartChanged,
    #[error("The cart can no longer be purchased. {0}")]
    StaleReference(String),
    #[error("The order is in status {0}, which does not allow this action")]
    InvalidState(OrderStatusType),
    #[error("Illegal status change for order {order_id}: expected {expected}, but it is {actual}. Target was {target}")]
    InvalidTransition { order_id: i64, expected: String, actual: String, target: String },
    #[error("The order has not been paid yet")]
    NotEligible,
    #[error("The payment gateway is unavailable. {0}")]
    GatewayUnavailable(String),
    #[error("The webhook signature is invalid")]
    InvalidSignature,
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
}

impl CheckoutError {
    pub fn invalid_transition<S: ToString, T: ToString>(order_id: i64, expected: S, actual: S, target: T) -> Self {
        Self::InvalidTransition {
            order_id,
            expected: expected.to_string(),
            actual: actual.to_string(),
            target: target.to_string(),
        }
    }
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        CheckoutError::DatabaseError(e.to_string())
    }
}

impl From<PricingError> for CheckoutError {
    fn from(e: PricingError) -> Self {
        match e {
            PricingError::CatalogUnavailable(s) => CheckoutError::DatabaseError(s),
            PricingError::StaleReference { .. } => CheckoutError::StaleReference(e.to_string()),
            PricingError::InvalidQuantity { .. } | PricingError::Overflow(_) => CheckoutError::Validation(e.to_string()),
        }
    }
}

impl From<GatewayError> for CheckoutError {
    fn from(e: GatewayError) -> Self {
        CheckoutError::GatewayUnavailable(e.to_string())
    }
}
