use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Payment};

/// Published once, after the order, its lines and its address snapshot have been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Published once per order, after the capture has been committed. Invoice generation and the "your order is paid"
/// notification hang off this event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub payment: Payment,
}

impl OrderPaidEvent {
    pub fn new(order: Order, payment: Payment) -> Self {
        Self { order, payment }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub order: Order,
    pub payment: Payment,
}

impl PaymentFailedEvent {
    pub fn new(order: Order, payment: Payment) -> Self {
        Self { order, payment }
    }

    pub fn reason(&self) -> &str {
        self.payment.failure_reason.as_deref().unwrap_or("no reason given")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    OrderPaid(OrderPaidEvent),
    PaymentFailed(PaymentFailedEvent),
}
