use std::path::Path;

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::SqliteDatabase;

/// Creates a fresh database at `url`, applies the migrations and returns a connection to it.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await
}

/// A database URL for a file in the system temp directory that no other test is using.
pub fn random_db_path() -> String {
    let path = std::env::temp_dir().join(format!("checkout_test_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub async fn run_migrations(url: &str) -> SqliteDatabase {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
    db
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if Sqlite::database_exists(p).await.unwrap_or(false) {
        if let Err(e) = Sqlite::drop_database(p).await {
            warn!("Error dropping database {p}: {e:?}");
        }
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}

/// Closes the pool and removes the database file.
pub async fn tear_down(db: SqliteDatabase) {
    db.pool().close().await;
    if let Err(e) = Sqlite::drop_database(db.url()).await {
        warn!("🚀️ Could not remove test database {}: {e}", db.url());
    }
}
