use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::db_types::{NewOrder, NewOrderAddress, NewOrderLine, Order, OrderAddress, OrderLine, OrderStatusType};

/// Inserts a new order row with status `Created`. This is not atomic. Embed it in a transaction together with
/// [`insert_order_lines`] and [`insert_order_address`] and pass `&mut *tx` as the connection argument.
///
/// A duplicate `(user_id, idempotency_key)` surfaces as a unique-violation database error.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                user_id,
                idempotency_key,
                subtotal,
                total,
                currency,
                status
            ) VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order.user_id)
    .bind(&order.idempotency_key)
    .bind(order.subtotal)
    .bind(order.total)
    .bind(&order.currency)
    .bind(OrderStatusType::Created.to_string())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order #{} inserted for user {}", order.id, order.user_id);
    Ok(order)
}

pub async fn insert_order_lines(
    order_id: i64,
    lines: &[NewOrderLine],
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO order_lines (
                order_id,
                product_id,
                material_id,
                product_name,
                base_price,
                material_price,
                unit_price,
                quantity,
                line_total
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9);
        "#,
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.material_id)
        .bind(&line.product_name)
        .bind(line.base_price)
        .bind(line.material_price)
        .bind(line.unit_price)
        .bind(line.quantity)
        .bind(line.line_total)
        .execute(&mut *conn)
        .await?;
    }
    trace!("🗃️ {} lines inserted for order #{order_id}", lines.len());
    Ok(())
}

pub async fn insert_order_address(
    order_id: i64,
    address: &NewOrderAddress,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO order_addresses (order_id, recipient, line1, line2, city, region, postal_code, country)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8);
    "#,
    )
    .bind(order_id)
    .bind(&address.recipient)
    .bind(&address.line1)
    .bind(&address.line2)
    .bind(&address.city)
    .bind(&address.region)
    .bind(&address.postal_code)
    .bind(&address.country)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_idempotency_key(
    user_id: i64,
    key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 AND idempotency_key = $2")
        .bind(user_id)
        .bind(key)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Resulting orders are ordered by `created_at` in ascending order. `id` breaks ties between orders created within
/// the same second.
pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn fetch_order_lines(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderLine>, sqlx::Error> {
    let lines = sqlx::query_as("SELECT * FROM order_lines WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(lines)
}

pub async fn fetch_order_address(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderAddress>, sqlx::Error> {
    let address = sqlx::query_as("SELECT * FROM order_addresses WHERE order_id = $1")
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(address)
}

/// Moves the order from `from` to `to`. The update only matches if the persisted status is still `from`, so of two
/// concurrent callers at most one gets `Some` back.
pub(crate) async fn update_order_status(
    id: i64,
    from: OrderStatusType,
    to: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let result: Option<Order> = sqlx::query_as(
        "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = $3 RETURNING *",
    )
    .bind(to.to_string())
    .bind(id)
    .bind(from.to_string())
    .fetch_optional(conn)
    .await?;
    match &result {
        Some(_) => trace!("🗃️ Order #{id} moved from {from} to {to}"),
        None => trace!("🗃️ Order #{id} was not in {from}. Status not changed"),
    }
    Ok(result)
}
