//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod carts;
pub mod catalog;
pub mod files;
pub mod orders;
pub mod payments;

const SQLITE_DB_URL: &str = "sqlite://data/checkout.db";

/// How long a connection waits on a locked database before giving up. Concurrent checkouts for the same key queue
/// up on the write lock rather than failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub fn db_url() -> String {
    let result = env::var("CHK_DATABASE_URL").unwrap_or_else(|_| {
        info!("CHK_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// True if the error is a UNIQUE constraint violation. The unique constraints on orders and payments are how
/// concurrent duplicate requests are detected.
pub(crate) fn is_unique_violation(e: &SqlxError) -> bool {
    matches!(e, SqlxError::Database(db_err) if db_err.is_unique_violation())
}
