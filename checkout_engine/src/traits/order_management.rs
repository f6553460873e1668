use crate::{
    checkout_api::errors::CheckoutError,
    db_types::{NewOrder, Order, OrderAddress, OrderLine, OrderStatusType},
    traits::InsertOrderResult,
};

/// The `OrderManagement` trait defines the behaviour for reading and writing orders in the database backend.
///
/// None of the read methods filter by owner. Ownership checks are the API layer's job.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, CheckoutError>;

    async fn fetch_order_by_idempotency_key(&self, user_id: i64, key: &str) -> Result<Option<Order>, CheckoutError>;

    /// All orders for the user, oldest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, CheckoutError>;

    async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, CheckoutError>;

    async fn fetch_order_address(&self, order_id: i64) -> Result<Option<OrderAddress>, CheckoutError>;

    /// Takes a new order, and in a single atomic transaction,
    /// * inserts the order row with status `Created`,
    /// * inserts every order line snapshot,
    /// * inserts the address snapshot,
    /// * deletes the priced lines (`order.cart_line_ids`) from the source cart.
    ///
    /// If an order with the same `(user_id, idempotency_key)` already exists, nothing is written and the existing
    /// order is returned as [`InsertOrderResult::AlreadyExists`]. This also covers the case where a concurrent insert
    /// wins the race on the unique constraint.
    ///
    /// If any priced line has already left the cart, or the cart holds lines that were not priced, nothing is written
    /// and the call fails with [`CheckoutError::CartChanged`].
    async fn insert_order_from_cart(&self, order: NewOrder) -> Result<InsertOrderResult, CheckoutError>;

    /// Sets the status of the order to `to`, but only if its persisted status is currently `from`.
    ///
    /// Returns the updated order, or `None` if no row matched (the order does not exist, or its status is no longer
    /// `from`). Does not validate the edge against the state machine.
    async fn update_order_status(
        &self,
        order_id: i64,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Option<Order>, CheckoutError>;
}
