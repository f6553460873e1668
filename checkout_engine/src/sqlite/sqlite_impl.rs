//! `SqliteDatabase` is a concrete implementation of a checkout engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the repository traits defined in the
//! [`crate::traits`] module.
//!
//! Every multi-statement write runs in a single transaction that opens with a write. SQLite then hands out the write
//! lock before any reads happen, so concurrent transactions queue on the busy timeout instead of failing on a stale
//! snapshot.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{carts, catalog, db_url, files, is_unique_violation, new_pool, orders, payments};
use crate::{
    checkout_api::errors::CheckoutError,
    db_types::{
        Address,
        Cart,
        CartLine,
        DigitalFile,
        FileAccessLog,
        Material,
        NewFileAccessLog,
        NewOrder,
        NewPayment,
        Order,
        OrderAddress,
        OrderLine,
        OrderStatusType,
        Payment,
        Product,
        Settlement,
    },
    traits::{
        CartManagement,
        CatalogLookup,
        FileAccessManagement,
        InsertOrderResult,
        InsertPaymentResult,
        OrderManagement,
        PaymentManagement,
        SettlementResult,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl CatalogLookup for SqliteDatabase {
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let product = catalog::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_material(&self, material_id: i64) -> Result<Option<Material>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let material = catalog::fetch_material(material_id, &mut conn).await?;
        Ok(material)
    }
}

impl CartManagement for SqliteDatabase {
    async fn fetch_cart(&self, cart_id: i64) -> Result<Option<Cart>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let cart = carts::fetch_cart(cart_id, &mut conn).await?;
        Ok(cart)
    }

    async fn fetch_cart_lines(&self, cart_id: i64) -> Result<Vec<CartLine>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let lines = carts::fetch_cart_lines(cart_id, &mut conn).await?;
        Ok(lines)
    }

    async fn fetch_address(&self, address_id: i64) -> Result<Option<Address>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let address = carts::fetch_address(address_id, &mut conn).await?;
        Ok(address)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_idempotency_key(&self, user_id: i64, key: &str) -> Result<Option<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_idempotency_key(user_id, key, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let lines = orders::fetch_order_lines(order_id, &mut conn).await?;
        Ok(lines)
    }

    async fn fetch_order_address(&self, order_id: i64) -> Result<Option<OrderAddress>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let address = orders::fetch_order_address(order_id, &mut conn).await?;
        Ok(address)
    }

    async fn insert_order_from_cart(&self, order: NewOrder) -> Result<InsertOrderResult, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let inserted = match orders::insert_order(&order, &mut tx).await {
            Ok(o) => o,
            Err(e) if is_unique_violation(&e) => {
                // Whoever holds the key has already committed, so their order is visible outside this transaction
                tx.rollback().await?;
                debug!(
                    "🗃️ Order for user {} with key '{}' already exists. Returning it.",
                    order.user_id, order.idempotency_key
                );
                let mut conn = self.pool.acquire().await?;
                let existing = orders::fetch_order_by_idempotency_key(order.user_id, &order.idempotency_key, &mut conn)
                    .await?
                    .ok_or_else(|| {
                        CheckoutError::DatabaseError(format!(
                            "Order with key '{}' violated a unique constraint but could not be found",
                            order.idempotency_key
                        ))
                    })?;
                return Ok(InsertOrderResult::AlreadyExists(existing));
            },
            Err(e) => return Err(e.into()),
        };
        orders::insert_order_lines(inserted.id, &order.lines, &mut tx).await?;
        orders::insert_order_address(inserted.id, &order.address, &mut tx).await?;
        let removed = carts::remove_cart_lines(order.cart_id, &order.cart_line_ids, &mut tx).await?;
        let remaining = carts::count_cart_lines(order.cart_id, &mut tx).await?;
        // The order must consume exactly the lines that were priced, and nothing else may be left behind
        if removed != order.cart_line_ids.len() as u64 || remaining > 0 {
            tx.rollback().await?;
            warn!(
                "🗃️ Cart #{} changed after it was priced ({removed} of {} lines still there, {remaining} others). \
                 Order for key '{}' rolled back.",
                order.cart_id,
                order.cart_line_ids.len(),
                order.idempotency_key
            );
            return Err(CheckoutError::CartChanged);
        }
        tx.commit().await?;
        debug!("🗃️ Order #{} committed with {} lines. Cart #{} cleared.", inserted.id, order.lines.len(), order.cart_id);
        Ok(InsertOrderResult::Inserted(inserted))
    }

    async fn update_order_status(
        &self,
        order_id: i64,
        from: OrderStatusType,
        to: OrderStatusType,
    ) -> Result<Option<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::update_order_status(order_id, from, to, &mut conn).await?;
        Ok(order)
    }
}

impl PaymentManagement for SqliteDatabase {
    async fn fetch_payment_for_order(&self, order_id: i64) -> Result<Option<Payment>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_for_order(order_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payment_by_external_order_id(
        &self,
        external_order_id: &str,
    ) -> Result<Option<Payment>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_by_external_order_id(external_order_id, &mut conn).await?;
        Ok(payment)
    }

    async fn insert_payment_for_order(&self, payment: NewPayment) -> Result<InsertPaymentResult, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let inserted = match payments::insert_payment(&payment, &mut tx).await {
            Ok(p) => p,
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                let mut conn = self.pool.acquire().await?;
                if let Some(existing) = payments::fetch_payment_for_order(payment.order_id, &mut conn).await? {
                    debug!("🗃️ Order #{} already has payment #{}. Returning it.", payment.order_id, existing.id);
                    return Ok(InsertPaymentResult::AlreadyExists(existing));
                }
                // The gateway handed out an order id we already hold for a different order
                return Err(CheckoutError::DatabaseError(format!(
                    "External order id {} is already in use",
                    payment.external_order_id
                )));
            },
            Err(e) => return Err(e.into()),
        };
        let from = OrderStatusType::Created;
        let to = OrderStatusType::PaymentPending;
        if orders::update_order_status(payment.order_id, from, to, &mut tx).await?.is_none() {
            let actual = orders::fetch_order_by_id(payment.order_id, &mut tx).await?.map(|o| o.status);
            tx.rollback().await?;
            warn!("🗃️ Order #{} is no longer {from}. Payment insert rolled back.", payment.order_id);
            return Err(match actual {
                Some(actual) => CheckoutError::invalid_transition(payment.order_id, from, actual, to),
                None => CheckoutError::NotFound("order"),
            });
        }
        tx.commit().await?;
        debug!("🗃️ Payment #{} committed. Order #{} is now {to}", inserted.id, payment.order_id);
        Ok(InsertPaymentResult::Inserted(inserted))
    }

    async fn settle_payment(&self, payment_id: i64, settlement: Settlement) -> Result<SettlementResult, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let Some(payment) = payments::settle_payment(payment_id, &settlement, &mut tx).await? else {
            trace!("🗃️ Payment #{payment_id} is already settled");
            return Ok(SettlementResult::NotApplied);
        };
        let from = OrderStatusType::PaymentPending;
        let to = settlement.order_status();
        let Some(order) = orders::update_order_status(payment.order_id, from, to, &mut tx).await? else {
            tx.rollback().await?;
            warn!("🗃️ Order #{} is not {from}. Settlement of payment #{payment_id} rolled back.", payment.order_id);
            return Ok(SettlementResult::NotApplied);
        };
        tx.commit().await?;
        debug!("🗃️ Payment #{payment_id} is now {}. Order #{} is now {to}", payment.status, order.id);
        Ok(SettlementResult::Applied { payment, order })
    }

    async fn mark_payment_authorized(
        &self,
        payment_id: i64,
        external_payment_id: &str,
    ) -> Result<Option<Payment>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::mark_authorized(payment_id, external_payment_id, &mut conn).await?;
        Ok(payment)
    }
}

impl FileAccessManagement for SqliteDatabase {
    async fn fetch_file(&self, file_id: i64) -> Result<Option<DigitalFile>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let file = files::fetch_file(file_id, &mut conn).await?;
        Ok(file)
    }

    async fn insert_access_log(&self, entry: NewFileAccessLog) -> Result<FileAccessLog, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let log = files::insert_access_log(&entry, &mut conn).await?;
        trace!("🗃️ File #{} access by user {} logged for order #{}", log.file_id, log.user_id, log.order_id);
        Ok(log)
    }

    async fn fetch_access_logs_for_order(&self, order_id: i64) -> Result<Vec<FileAccessLog>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let logs = files::fetch_access_logs_for_order(order_id, &mut conn).await?;
        Ok(logs)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the `CHK_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}
