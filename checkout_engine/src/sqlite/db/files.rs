use sqlx::SqliteConnection;

use crate::db_types::{DigitalFile, FileAccessLog, NewFileAccessLog};

pub async fn fetch_file(id: i64, conn: &mut SqliteConnection) -> Result<Option<DigitalFile>, sqlx::Error> {
    let file = sqlx::query_as("SELECT * FROM digital_files WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(file)
}

/// Appends an entry to the access log. The table has triggers that reject updates and deletes.
pub async fn insert_access_log(
    entry: &NewFileAccessLog,
    conn: &mut SqliteConnection,
) -> Result<FileAccessLog, sqlx::Error> {
    let log = sqlx::query_as(
        r#"
        INSERT INTO file_access_log (user_id, order_id, file_id, requester_address)
        VALUES ($1, $2, $3, $4)
        RETURNING *;
    "#,
    )
    .bind(entry.user_id)
    .bind(entry.order_id)
    .bind(entry.file_id)
    .bind(&entry.requester_address)
    .fetch_one(conn)
    .await?;
    Ok(log)
}

pub async fn fetch_access_logs_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<FileAccessLog>, sqlx::Error> {
    let logs = sqlx::query_as("SELECT * FROM file_access_log WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(logs)
}
