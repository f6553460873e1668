//! Catalog, cart and address fixtures.
//!
//! These tables belong to other parts of the platform, so the engine has no API for writing them. Tests write them
//! directly.
use sqlx::SqlitePool;

pub async fn insert_product(pool: &SqlitePool, name: &str, base_price: i64) -> i64 {
    sqlx::query_scalar("INSERT INTO products (name, base_price, is_active) VALUES ($1, $2, TRUE) RETURNING id")
        .bind(name)
        .bind(base_price)
        .fetch_one(pool)
        .await
        .expect("Error inserting product")
}

pub async fn insert_material(pool: &SqlitePool, name: &str, price: i64) -> i64 {
    sqlx::query_scalar("INSERT INTO materials (name, price, is_active) VALUES ($1, $2, TRUE) RETURNING id")
        .bind(name)
        .bind(price)
        .fetch_one(pool)
        .await
        .expect("Error inserting material")
}

pub async fn set_product_price(pool: &SqlitePool, product_id: i64, base_price: i64) {
    sqlx::query("UPDATE products SET base_price = $1 WHERE id = $2")
        .bind(base_price)
        .bind(product_id)
        .execute(pool)
        .await
        .expect("Error updating product price");
}

pub async fn set_product_active(pool: &SqlitePool, product_id: i64, is_active: bool) {
    sqlx::query("UPDATE products SET is_active = $1 WHERE id = $2")
        .bind(is_active)
        .bind(product_id)
        .execute(pool)
        .await
        .expect("Error updating product");
}

pub async fn create_cart(pool: &SqlitePool, user_id: i64) -> i64 {
    sqlx::query_scalar("INSERT INTO carts (user_id) VALUES ($1) RETURNING id")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("Error creating cart")
}

pub async fn add_cart_line(pool: &SqlitePool, cart_id: i64, product_id: i64, material_id: i64, quantity: i64) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO cart_lines (cart_id, product_id, material_id, quantity) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(material_id)
    .bind(quantity)
    .fetch_one(pool)
    .await
    .expect("Error adding cart line")
}

pub async fn cart_line_count(pool: &SqlitePool, cart_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM cart_lines WHERE cart_id = $1")
        .bind(cart_id)
        .fetch_one(pool)
        .await
        .expect("Error counting cart lines")
}

pub async fn insert_address(pool: &SqlitePool, user_id: i64, recipient: &str) -> i64 {
    sqlx::query_scalar(
        r#"INSERT INTO addresses (user_id, recipient, line1, line2, city, region, postal_code, country)
        VALUES ($1, $2, '12 MG Road', NULL, 'Bengaluru', 'KA', '560001', 'IN') RETURNING id"#,
    )
    .bind(user_id)
    .bind(recipient)
    .fetch_one(pool)
    .await
    .expect("Error inserting address")
}

pub async fn update_address_city(pool: &SqlitePool, address_id: i64, city: &str) {
    sqlx::query("UPDATE addresses SET city = $1 WHERE id = $2")
        .bind(city)
        .bind(address_id)
        .execute(pool)
        .await
        .expect("Error updating address");
}

pub async fn delete_address(pool: &SqlitePool, address_id: i64) {
    sqlx::query("DELETE FROM addresses WHERE id = $1")
        .bind(address_id)
        .execute(pool)
        .await
        .expect("Error deleting address");
}

pub async fn insert_digital_file(pool: &SqlitePool, product_id: i64, storage_key: &str, file_name: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO digital_files (product_id, storage_key, file_name) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(product_id)
    .bind(storage_key)
    .bind(file_name)
    .fetch_one(pool)
    .await
    .expect("Error inserting digital file")
}

/// Ids of everything a typical checkout test needs.
#[derive(Debug, Clone, Copy)]
pub struct Fixture {
    pub user_id: i64,
    pub product_id: i64,
    pub material_id: i64,
    pub cart_id: i64,
    pub address_id: i64,
    pub file_id: i64,
}

/// A user with a cart holding 2x a product priced at 1500 + 500, a saved address, and a file attached to the
/// product.
pub async fn standard_fixture(pool: &SqlitePool, user_id: i64) -> Fixture {
    let product_id = insert_product(pool, "Field Guide (print)", 1500).await;
    let material_id = insert_material(pool, "Hardcover", 500).await;
    let cart_id = create_cart(pool, user_id).await;
    add_cart_line(pool, cart_id, product_id, material_id, 2).await;
    let address_id = insert_address(pool, user_id, "Asha Rao").await;
    let key = format!("guides/field-guide-{product_id}.pdf");
    let file_id = insert_digital_file(pool, product_id, &key, "field-guide.pdf").await;
    Fixture { user_id, product_id, material_id, cart_id, address_id, file_id }
}
