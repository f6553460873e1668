use sqlx::SqliteConnection;

use crate::db_types::{Material, Product};

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_material(id: i64, conn: &mut SqliteConnection) -> Result<Option<Material>, sqlx::Error> {
    let material = sqlx::query_as("SELECT * FROM materials WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(material)
}
