//! Post-commit event hooks.
//!
//! The engine publishes an event after each committed state change. The hooks here turn those events into the
//! side effects the storefront expects: an invoice when an order is paid, and customer notifications. They run on
//! their own tasks and have no way of affecting the order or payment that triggered them.
use checkout_engine::{
    db_types::{Order, Payment},
    events::{EventHandlers, EventHooks, OrderCreatedEvent, OrderPaidEvent, PaymentFailedEvent},
};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use log::*;
use serde::Serialize;

pub const CHECKOUT_EVENT_BUFFER_SIZE: usize = 64;

/// A record of a paid order, suitable for handing to an invoicing system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invoice {
    pub number: String,
    pub order_id: i64,
    pub user_id: i64,
    pub amount: String,
    pub currency: String,
    pub gateway_reference: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl Invoice {
    pub fn for_paid_order(order: &Order, payment: &Payment) -> Self {
        Self {
            number: format!("INV-{:08}", order.id),
            order_id: order.id,
            user_id: order.user_id,
            amount: order.total.to_string(),
            currency: order.currency.clone(),
            gateway_reference: payment.external_payment_id.clone(),
            paid_at: payment.updated_at,
        }
    }
}

pub fn checkout_event_handlers() -> EventHandlers {
    EventHandlers::new(CHECKOUT_EVENT_BUFFER_SIZE, checkout_hooks())
}

pub fn checkout_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_created(|ev: OrderCreatedEvent| {
        let order = ev.order;
        info!(
            "📬️ Order #{} created for user {}: {} {} ({} before adjustments)",
            order.id, order.user_id, order.total, order.currency, order.subtotal
        );
        no_op()
    });
    hooks.on_order_paid(|ev: OrderPaidEvent| {
        Box::pin(async move {
            let invoice = Invoice::for_paid_order(&ev.order, &ev.payment);
            match serde_json::to_string(&invoice) {
                Ok(json) => info!("📬️ Issued invoice {} for order #{}: {json}", invoice.number, invoice.order_id),
                Err(e) => error!("📬️ Could not serialize invoice for order #{}. {e}", ev.order.id),
            }
            info!("📬️ Notifying user {} that order #{} is paid", ev.order.user_id, ev.order.id);
        })
    });
    hooks.on_payment_failed(|ev: PaymentFailedEvent| {
        warn!(
            "📬️ Notifying user {} that payment [{}] for order #{} failed: {}",
            ev.order.user_id,
            ev.payment.external_order_id,
            ev.order.id,
            ev.reason()
        );
        no_op()
    });
    hooks
}

fn no_op() -> BoxFuture<'static, ()> {
    Box::pin(async {})
}
