use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{EventHandler, EventProducer, Handler, OrderCreatedEvent, OrderPaidEvent, PaymentFailedEvent};

/// Fan-out publisher handed to the APIs. Each event type has its own list of producers; publishing sends a copy of
/// the event to every one of them.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub payment_failed_producer: Vec<EventProducer<PaymentFailedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_created(&self, event: OrderCreatedEvent) {
        for producer in &self.order_created_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_order_paid(&self, event: OrderPaidEvent) {
        for producer in &self.order_paid_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_payment_failed(&self, event: PaymentFailedEvent) {
        for producer in &self.payment_failed_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_payment_failed: Option<EventHandler<PaymentFailedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_created = hooks.on_order_created.map(|f| EventHandler::new(buffer_size, f));
        let on_order_paid = hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_payment_failed = hooks.on_payment_failed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_created, on_order_paid, on_payment_failed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_failed {
            result.payment_failed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_created {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_payment_failed {
            tokio::spawn(handler.start_handler());
        }
        debug!("📬️ Event handlers started");
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_payment_failed: Option<Handler<PaymentFailedEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_payment_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentFailedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_failed = Some(Arc::new(f));
        self
    }
}
