use std::fmt::Debug;

use log::*;

use crate::{
    checkout_api::{
        errors::CheckoutError,
        order_objects::{OrderDetails, MAX_IDEMPOTENCY_KEY_LENGTH},
        pricing::PriceSnapshotResolver,
    },
    db_types::{NewOrder, NewOrderAddress, Order, OrderStatusType},
    events::{EventProducers, OrderCreatedEvent},
    traits::{CartManagement, CatalogLookup, InsertOrderResult, OrderManagement},
};

/// How many times a checkout is re-run when the cart changes between pricing and commit.
pub const MAX_CHECKOUT_ATTEMPTS: usize = 3;

/// `OrderLedgerApi` turns carts into orders and owns the order state machine.
///
/// Order creation is idempotent per `(user_id, idempotency_key)`. Retrying a checkout with the same key, including
/// concurrently, always yields the same order.
pub struct OrderLedgerApi<B> {
    db: B,
    currency: String,
    producers: EventProducers,
}

impl<B> Debug for OrderLedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderLedgerApi")
    }
}

impl<B> OrderLedgerApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, currency: checkout_common::DEFAULT_CURRENCY_CODE.to_string(), producers }
    }

    /// Sets the currency recorded on new orders.
    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }
}

impl<B> OrderLedgerApi<B>
where B: OrderManagement + CartManagement + CatalogLookup
{
    /// Converts the user's cart into an order.
    ///
    /// If the user already has an order for `idempotency_key`, it is returned unchanged as
    /// [`InsertOrderResult::AlreadyExists`] and nothing else happens. Otherwise the cart is priced against the live
    /// catalog, and the order, its line snapshots and a snapshot of the shipping address are written in one
    /// transaction that also removes the priced lines from the cart.
    ///
    /// If the cart changes between pricing and commit, the attempt is discarded and the whole checkout is run again,
    /// up to [`MAX_CHECKOUT_ATTEMPTS`] times. A cart that another checkout has already emptied then fails with
    /// `EmptyCart`.
    ///
    /// Errors:
    /// * `Validation` if the key is empty or too long.
    /// * `NotFound` if the cart does not exist or belongs to someone else.
    /// * `EmptyCart` if the cart has no lines.
    /// * `StaleReference` if something in the cart can no longer be bought.
    /// * `Forbidden` if the address does not exist or belongs to someone else.
    /// * `CartChanged` if the cart kept changing under every attempt.
    pub async fn create_order(
        &self,
        user_id: i64,
        idempotency_key: &str,
        cart_id: i64,
        address_id: i64,
    ) -> Result<InsertOrderResult, CheckoutError> {
        validate_idempotency_key(idempotency_key)?;
        let mut attempt = 1;
        loop {
            match self.try_create_order(user_id, idempotency_key, cart_id, address_id).await {
                Err(CheckoutError::CartChanged) if attempt < MAX_CHECKOUT_ATTEMPTS => {
                    debug!("🧾️ Cart #{cart_id} changed during checkout attempt {attempt}. Trying again.");
                    attempt += 1;
                },
                result => return result,
            }
        }
    }

    async fn try_create_order(
        &self,
        user_id: i64,
        idempotency_key: &str,
        cart_id: i64,
        address_id: i64,
    ) -> Result<InsertOrderResult, CheckoutError> {
        if let Some(order) = self.db.fetch_order_by_idempotency_key(user_id, idempotency_key).await? {
            debug!("🧾️ Order #{} already exists for key '{idempotency_key}'. Returning it.", order.id);
            return Ok(InsertOrderResult::AlreadyExists(order));
        }
        let cart = self.db.fetch_cart(cart_id).await?.filter(|c| c.user_id == user_id).ok_or_else(|| {
            debug!("🧾️ Cart #{cart_id} does not exist or does not belong to user {user_id}");
            CheckoutError::NotFound("cart")
        })?;
        let cart_lines = self.db.fetch_cart_lines(cart.id).await?;
        if cart_lines.is_empty() {
            // A concurrent request with the same key may have just converted this cart
            if let Some(order) = self.db.fetch_order_by_idempotency_key(user_id, idempotency_key).await? {
                debug!("🧾️ Cart #{cart_id} was emptied by order #{} for the same key. Returning it.", order.id);
                return Ok(InsertOrderResult::AlreadyExists(order));
            }
            return Err(CheckoutError::EmptyCart);
        }
        let snapshot = PriceSnapshotResolver::new(&self.db).resolve(&cart_lines).await?;
        let address = self.db.fetch_address(address_id).await?.filter(|a| a.user_id == user_id).ok_or_else(|| {
            warn!("🧾️ User {user_id} tried to check out with address #{address_id}, which is not theirs");
            CheckoutError::Forbidden("address")
        })?;
        let new_order = NewOrder {
            user_id,
            idempotency_key: idempotency_key.to_string(),
            cart_id: cart.id,
            cart_line_ids: cart_lines.iter().map(|l| l.id).collect(),
            subtotal: snapshot.subtotal,
            total: snapshot.total,
            currency: self.currency.clone(),
            lines: snapshot.lines,
            address: NewOrderAddress::from(address),
        };
        let result = self.db.insert_order_from_cart(new_order).await?;
        match &result {
            InsertOrderResult::Inserted(order) => {
                info!("🧾️ Order #{} created for user {user_id}. Total: {}", order.id, order.total);
                self.producers.publish_order_created(OrderCreatedEvent::new(order.clone())).await;
            },
            InsertOrderResult::AlreadyExists(order) => {
                debug!("🧾️ Lost the race for key '{idempotency_key}' to order #{}. Returning it.", order.id);
            },
        }
        Ok(result)
    }

    /// Fetches an order. Orders that belong to someone else are reported as `NotFound`.
    pub async fn get_order(&self, order_id: i64, caller_user_id: i64) -> Result<Order, CheckoutError> {
        self.db
            .fetch_order_by_id(order_id)
            .await?
            .filter(|o| o.user_id == caller_user_id)
            .ok_or(CheckoutError::NotFound("order"))
    }

    pub async fn order_details(&self, order_id: i64, caller_user_id: i64) -> Result<OrderDetails, CheckoutError> {
        let order = self.get_order(order_id, caller_user_id).await?;
        let lines = self.db.fetch_order_lines(order.id).await?;
        let address = self.db.fetch_order_address(order.id).await?;
        Ok(OrderDetails { order, lines, address })
    }

    /// All of the caller's orders, oldest first.
    pub async fn list_orders(&self, caller_user_id: i64) -> Result<Vec<Order>, CheckoutError> {
        self.db.fetch_orders_for_user(caller_user_id).await
    }
}

impl<B> OrderLedgerApi<B>
where B: OrderManagement
{
    /// Moves an order along one edge of the state machine.
    ///
    /// Fails with `InvalidTransition` if `from → to` is not an edge, or if the persisted status is not `from` at the
    /// moment of the update. Of two concurrent calls with the same `from`, at most one succeeds.
    pub async fn transition_status(
        &self,
        order_id: i64,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Order, CheckoutError> {
        if !from.can_transition_to(to) {
            warn!("🧾️ Refusing to move order #{order_id} from {from} to {to}. That is not a legal transition.");
            return Err(CheckoutError::invalid_transition(order_id, from, from, to));
        }
        match self.db.update_order_status(order_id, from, to).await? {
            Some(order) => {
                debug!("🧾️ Order #{order_id} moved from {from} to {to}");
                Ok(order)
            },
            None => {
                let current = self.db.fetch_order_by_id(order_id).await?.ok_or(CheckoutError::NotFound("order"))?;
                warn!("🧾️ Order #{order_id} is {}, not {from}. Cannot move it to {to}", current.status);
                Err(CheckoutError::invalid_transition(order_id, from, current.status, to))
            },
        }
    }
}

fn validate_idempotency_key(key: &str) -> Result<(), CheckoutError> {
    if key.trim().is_empty() {
        return Err(CheckoutError::Validation("The idempotency key cannot be empty".into()));
    }
    if key.len() > MAX_IDEMPOTENCY_KEY_LENGTH {
        return Err(CheckoutError::Validation(format!(
            "The idempotency key cannot be longer than {MAX_IDEMPOTENCY_KEY_LENGTH} characters"
        )));
    }
    Ok(())
}
