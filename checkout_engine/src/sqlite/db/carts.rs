use log::trace;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::db_types::{Address, Cart, CartLine};

pub async fn fetch_cart(id: i64, conn: &mut SqliteConnection) -> Result<Option<Cart>, sqlx::Error> {
    let cart = sqlx::query_as("SELECT * FROM carts WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(cart)
}

pub async fn fetch_cart_lines(cart_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartLine>, sqlx::Error> {
    let lines =
        sqlx::query_as("SELECT * FROM cart_lines WHERE cart_id = $1 ORDER BY id").bind(cart_id).fetch_all(conn).await?;
    Ok(lines)
}

/// Removes the given lines from the cart and returns how many were actually deleted. Ids that are no longer in the
/// cart are skipped. The cart itself is kept so the user can keep shopping with it.
pub async fn remove_cart_lines(
    cart_id: i64,
    line_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    if line_ids.is_empty() {
        return Ok(0);
    }
    let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM cart_lines WHERE cart_id = ");
    qb.push_bind(cart_id);
    qb.push(" AND id IN (");
    let mut ids = qb.separated(", ");
    for id in line_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(")");
    let result = qb.build().execute(conn).await?;
    trace!("🗃️ Removed {} of {} lines from cart #{cart_id}", result.rows_affected(), line_ids.len());
    Ok(result.rows_affected())
}

pub async fn count_cart_lines(cart_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count =
        sqlx::query_scalar("SELECT COUNT(*) FROM cart_lines WHERE cart_id = $1").bind(cart_id).fetch_one(conn).await?;
    Ok(count)
}

pub async fn fetch_address(id: i64, conn: &mut SqliteConnection) -> Result<Option<Address>, sqlx::Error> {
    let address = sqlx::query_as("SELECT * FROM addresses WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(address)
}
