//! Wire format of the payment gateway's webhook deliveries, and what the reconciler did with them.
//!
//! A delivery looks like this (fields we don't use are omitted):
//!
//! ```json
//! {
//!   "event": "payment.captured",
//!   "payload": {
//!     "payment": {
//!       "entity": {
//!         "id": "pay_29QQoUBi66xm2f",
//!         "order_id": "order_9A33XWu170gUtm",
//!         "amount": 4000,
//!         "currency": "INR",
//!         "status": "captured",
//!         "error_description": null
//!       }
//!     }
//!   }
//! }
//! ```
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db_types::OrderStatusType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub payload: WebhookPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub payment: PaymentEnvelope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEnvelope {
    pub entity: PaymentEntity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEntity {
    /// The gateway's payment id
    pub id: String,
    /// The gateway's order id. This is what we hold as `Payment.external_order_id`.
    pub order_id: String,
    /// For diagnostics only. The amount we charge is always the order total.
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl WebhookEvent {
    pub fn event_type(&self) -> GatewayEventType {
        GatewayEventType::from(self.event.as_str())
    }

    pub fn entity(&self) -> &PaymentEntity {
        &self.payload.payment.entity
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventType {
    PaymentAuthorized,
    PaymentCaptured,
    PaymentFailed,
    Other(String),
}

impl From<&str> for GatewayEventType {
    fn from(value: &str) -> Self {
        match value {
            "payment.authorized" => Self::PaymentAuthorized,
            "payment.captured" => Self::PaymentCaptured,
            "payment.failed" => Self::PaymentFailed,
            s => Self::Other(s.to_string()),
        }
    }
}

impl Display for GatewayEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PaymentAuthorized => write!(f, "payment.authorized"),
            Self::PaymentCaptured => write!(f, "payment.captured"),
            Self::PaymentFailed => write!(f, "payment.failed"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// The result of a verified webhook delivery. None of these are errors: the gateway gets a 200 for all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Payment and order were moved to their new status together.
    Applied { order_id: i64, status: OrderStatusType },
    /// The gateway authorized the payment. The order is still waiting for capture.
    Authorized { order_id: i64 },
    /// This event was already applied. Nothing changed.
    AlreadyApplied { order_id: i64 },
    /// The gateway order id does not match any payment of ours.
    UnknownPayment { external_order_id: String },
    /// We don't act on this event type.
    Ignored { event: String },
}
