use checkout_common::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderAddress, OrderLine, Payment};

/// The longest idempotency key we will store.
pub const MAX_IDEMPOTENCY_KEY_LENGTH: usize = 128;

/// An order together with its frozen line items and shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub address: Option<OrderAddress>,
}

/// What a client needs to open the gateway's checkout widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub external_order_id: String,
    pub amount: Money,
    pub currency: String,
}

impl From<&Payment> for PaymentIntent {
    fn from(payment: &Payment) -> Self {
        Self {
            external_order_id: payment.external_order_id.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
        }
    }
}

/// A download capability. `url` stops working at `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUrl {
    pub url: String,
    pub expires_in_secs: i64,
    pub expires_at: DateTime<Utc>,
}
