use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::db_types::{NewPayment, Payment, PaymentStatus, Settlement};

/// Inserts a payment with status `Initiated`. A second payment for the same order, or a reused gateway order id,
/// surfaces as a unique-violation database error.
pub async fn insert_payment(payment: &NewPayment, conn: &mut SqliteConnection) -> Result<Payment, sqlx::Error> {
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, external_order_id, amount, currency, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(payment.order_id)
    .bind(&payment.external_order_id)
    .bind(payment.amount)
    .bind(&payment.currency)
    .bind(PaymentStatus::Initiated.to_string())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Payment #{} [{}] inserted for order #{}", payment.id, payment.external_order_id, payment.order_id);
    Ok(payment)
}

pub async fn fetch_payment_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE order_id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_payment_by_external_order_id(
    external_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE external_order_id = $1")
        .bind(external_order_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

/// Applies a terminal gateway result to the payment. Only open payments (`Created`, `Initiated` or `Authorized`)
/// match, so a payment is settled at most once.
pub(crate) async fn settle_payment(
    id: i64,
    settlement: &Settlement,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
        UPDATE payments SET
            status = $1,
            external_payment_id = COALESCE($2, external_payment_id),
            failure_reason = $3,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $4 AND status IN ('Created', 'Initiated', 'Authorized')
        RETURNING *
    "#,
    )
    .bind(settlement.payment_status().to_string())
    .bind(settlement.external_payment_id())
    .bind(settlement.reason())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ Settlement {} for payment #{id}", if payment.is_some() { "applied" } else { "skipped" });
    Ok(payment)
}

pub(crate) async fn mark_authorized(
    id: i64,
    external_payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        r#"
        UPDATE payments SET status = $1, external_payment_id = $2, updated_at = CURRENT_TIMESTAMP
        WHERE id = $3 AND status = $4
        RETURNING *
    "#,
    )
    .bind(PaymentStatus::Authorized.to_string())
    .bind(external_payment_id)
    .bind(id)
    .bind(PaymentStatus::Initiated.to_string())
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}
