//! # Payment reconciliation
//!
//! Payments travel through the gateway in two halves. [`PaymentReconcilerApi::initiate_payment`] asks the gateway for
//! a remote order and records a local `Payment` for it. Some time later the gateway calls our webhook, and
//! [`PaymentReconcilerApi::handle_webhook_event`] applies the result to the payment and its order.
//!
//! Webhook bodies are untrusted until their signature has been checked against the shared secret. After that, the
//! only thing we take from the body is the event type and the ids. Amounts in the body are logged, never used.
//!
//! Deliveries can be duplicated and can arrive concurrently. Every status change is guarded on the current status, so
//! repeated deliveries converge on one state change and one set of hook notifications.
use std::fmt::Debug;

use checkout_common::{Money, Secret};
use log::*;

use crate::{
    checkout_api::{
        errors::CheckoutError,
        order_objects::PaymentIntent,
        webhook_objects::{GatewayEventType, PaymentEntity, WebhookEvent, WebhookOutcome},
    },
    db_types::{NewPayment, Order, OrderStatusType, Payment, Settlement},
    events::{EventProducers, OrderPaidEvent, PaymentFailedEvent},
    helpers::{body_digest, verify_signature},
    traits::{OrderManagement, PaymentGateway, PaymentManagement, SettlementResult},
};

pub struct PaymentReconcilerApi<B, G> {
    db: B,
    gateway: G,
    webhook_secret: Secret<String>,
    producers: EventProducers,
}

impl<B, G> Debug for PaymentReconcilerApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentReconcilerApi")
    }
}

impl<B, G> PaymentReconcilerApi<B, G> {
    pub fn new(db: B, gateway: G, webhook_secret: Secret<String>, producers: EventProducers) -> Self {
        Self { db, gateway, webhook_secret, producers }
    }
}

impl<B, G> PaymentReconcilerApi<B, G>
where
    B: OrderManagement + PaymentManagement,
    G: PaymentGateway,
{
    /// Starts payment for the caller's order.
    ///
    /// Calling this again for the same order returns the payment that already exists, without contacting the gateway.
    /// Otherwise, the gateway is asked for a remote order for the order total, and only once that has succeeded is the
    /// local payment written (together with moving the order to `PaymentPending`). A gateway failure leaves no trace
    /// locally.
    pub async fn initiate_payment(&self, order_id: i64, caller_user_id: i64) -> Result<PaymentIntent, CheckoutError> {
        let order = self.owned_order(order_id, caller_user_id).await?;
        if let Some(payment) = self.db.fetch_payment_for_order(order.id).await? {
            debug!("💳️ Order #{order_id} already has payment [{}]. Returning it.", payment.external_order_id);
            return Ok(PaymentIntent::from(&payment));
        }
        if order.status != OrderStatusType::Created {
            debug!("💳️ Cannot start payment for order #{order_id}. It is {}", order.status);
            return Err(CheckoutError::InvalidState(order.status));
        }
        let receipt = format!("order_{}", order.id);
        let external_order_id =
            self.gateway.create_remote_intent(order.total, &order.currency, &receipt).await.map_err(|e| {
                error!("💳️ Could not create a payment intent for order #{order_id}. {e}");
                CheckoutError::from(e)
            })?;
        debug!("💳️ Gateway created [{external_order_id}] for order #{order_id} ({} {})", order.total, order.currency);
        let new_payment =
            NewPayment { order_id: order.id, external_order_id, amount: order.total, currency: order.currency.clone() };
        let payment = self.db.insert_payment_for_order(new_payment).await?.into_payment();
        info!("💳️ Payment [{}] for order #{order_id} is awaiting the gateway", payment.external_order_id);
        Ok(PaymentIntent::from(&payment))
    }

    /// The payment for the caller's order, if payment has been started.
    pub async fn payment_for_order(&self, order_id: i64, caller_user_id: i64) -> Result<Payment, CheckoutError> {
        let order = self.owned_order(order_id, caller_user_id).await?;
        self.db.fetch_payment_for_order(order.id).await?.ok_or(CheckoutError::NotFound("payment"))
    }

    /// Applies a webhook delivery from the gateway.
    ///
    /// `raw_body` must be the request body exactly as received. `signature` is the hex-encoded HMAC-SHA256 the gateway
    /// sent alongside it.
    ///
    /// Errors:
    /// * `InvalidSignature` if the signature does not match. Nothing is read or written.
    /// * `Validation` if the (correctly signed) body is not a payment event.
    /// * `InvalidTransition` if the event contradicts what we have already recorded, e.g. a capture for a payment we
    ///   have already marked as failed.
    pub async fn handle_webhook_event(&self, raw_body: &[u8], signature: &str) -> Result<WebhookOutcome, CheckoutError> {
        if !verify_signature(raw_body, signature, self.webhook_secret.reveal()) {
            warn!(
                "📥️ Rejected webhook delivery with an invalid signature. Body digest: {}, length: {}",
                body_digest(raw_body),
                raw_body.len()
            );
            return Err(CheckoutError::InvalidSignature);
        }
        let event = serde_json::from_slice::<WebhookEvent>(raw_body).map_err(|e| {
            warn!("📥️ Webhook body has a valid signature but could not be parsed. {e}");
            CheckoutError::Validation(format!("Malformed webhook payload. {e}"))
        })?;
        let event_type = event.event_type();
        let entity = event.entity();
        trace!("📥️ Received {event_type} for [{}]", entity.order_id);
        // `None` means authorization only
        let settlement = match event_type {
            GatewayEventType::PaymentCaptured => {
                Some(Settlement::Captured { external_payment_id: entity.id.clone() })
            },
            GatewayEventType::PaymentFailed => Some(Settlement::Failed {
                external_payment_id: Some(entity.id.clone()),
                reason: entity.error_description.clone(),
            }),
            GatewayEventType::PaymentAuthorized => None,
            GatewayEventType::Other(name) => {
                debug!("📥️ Ignoring {name} event");
                return Ok(WebhookOutcome::Ignored { event: name });
            },
        };
        let Some(payment) = self.db.fetch_payment_by_external_order_id(&entity.order_id).await? else {
            info!("📥️ {} for [{}] does not match any payment. Ignoring it.", event.event, entity.order_id);
            return Ok(WebhookOutcome::UnknownPayment { external_order_id: entity.order_id.clone() });
        };
        log_payload_amount(&payment, entity);
        match settlement {
            Some(settlement) => self.settle(payment, settlement).await,
            None => self.authorize(payment, &entity.id).await,
        }
    }

    async fn settle(&self, payment: Payment, settlement: Settlement) -> Result<WebhookOutcome, CheckoutError> {
        let order = self.order_for_payment(&payment).await?;
        if is_settled_as(&payment, &order, &settlement) {
            debug!("📥️ {} for order #{} has already been applied", settlement.payment_status(), order.id);
            return Ok(WebhookOutcome::AlreadyApplied { order_id: order.id });
        }
        match self.db.settle_payment(payment.id, settlement.clone()).await? {
            SettlementResult::Applied { payment, order } => {
                info!("📥️ Order #{} is now {} (payment [{}])", order.id, order.status, payment.external_order_id);
                let outcome = WebhookOutcome::Applied { order_id: order.id, status: order.status };
                match settlement {
                    Settlement::Captured { .. } => {
                        self.producers.publish_order_paid(OrderPaidEvent::new(order, payment)).await;
                    },
                    Settlement::Failed { .. } => {
                        self.producers.publish_payment_failed(PaymentFailedEvent::new(order, payment)).await;
                    },
                }
                Ok(outcome)
            },
            SettlementResult::NotApplied => {
                // Either a concurrent delivery of the same event got there first, or the event contradicts the
                // recorded state. Re-read to find out which.
                let payment = self
                    .db
                    .fetch_payment_for_order(payment.order_id)
                    .await?
                    .ok_or(CheckoutError::NotFound("payment"))?;
                let order = self.order_for_payment(&payment).await?;
                if is_settled_as(&payment, &order, &settlement) {
                    debug!("📥️ A concurrent delivery already applied this event to order #{}", order.id);
                    return Ok(WebhookOutcome::AlreadyApplied { order_id: order.id });
                }
                warn!(
                    "📥️ Cannot apply {} to payment [{}]. Payment is {} and order #{} is {}",
                    settlement.payment_status(),
                    payment.external_order_id,
                    payment.status,
                    order.id,
                    order.status
                );
                Err(CheckoutError::invalid_transition(
                    order.id,
                    OrderStatusType::PaymentPending,
                    order.status,
                    settlement.order_status(),
                ))
            },
        }
    }

    async fn authorize(&self, payment: Payment, external_payment_id: &str) -> Result<WebhookOutcome, CheckoutError> {
        let order_id = payment.order_id;
        match self.db.mark_payment_authorized(payment.id, external_payment_id).await? {
            Some(p) => {
                debug!("📥️ Payment [{}] for order #{order_id} is authorized", p.external_order_id);
                Ok(WebhookOutcome::Authorized { order_id })
            },
            None => {
                debug!("📥️ Payment [{}] is {}. Authorization is stale.", payment.external_order_id, payment.status);
                Ok(WebhookOutcome::AlreadyApplied { order_id })
            },
        }
    }

    async fn owned_order(&self, order_id: i64, caller_user_id: i64) -> Result<Order, CheckoutError> {
        self.db
            .fetch_order_by_id(order_id)
            .await?
            .filter(|o| o.user_id == caller_user_id)
            .ok_or(CheckoutError::NotFound("order"))
    }

    async fn order_for_payment(&self, payment: &Payment) -> Result<Order, CheckoutError> {
        self.db.fetch_order_by_id(payment.order_id).await?.ok_or_else(|| {
            error!("💳️ Payment #{} refers to order #{}, which does not exist", payment.id, payment.order_id);
            CheckoutError::DatabaseError(format!("Order #{} is missing", payment.order_id))
        })
    }
}

fn is_settled_as(payment: &Payment, order: &Order, settlement: &Settlement) -> bool {
    payment.status == settlement.payment_status() && order.status == settlement.order_status()
}

fn log_payload_amount(payment: &Payment, entity: &PaymentEntity) {
    if let Some(amount) = entity.amount.map(Money::from) {
        if amount != payment.amount {
            warn!(
                "📥️ Gateway reports {amount} for [{}], but we charged {}. The recorded amount is kept.",
                payment.external_order_id, payment.amount
            );
        }
    }
    if let Some(currency) = entity.currency.as_deref() {
        if !currency.eq_ignore_ascii_case(&payment.currency) {
            let expected = &payment.currency;
            warn!("📥️ Gateway reports currency {currency} for [{}], expected {expected}", payment.external_order_id);
        }
    }
}
