use crate::{
    checkout_api::errors::CheckoutError,
    db_types::{Material, Product},
};

/// Current catalog state. Catalog management lives elsewhere; the checkout core only ever reads it.
#[allow(async_fn_in_trait)]
pub trait CatalogLookup {
    /// Fetches the product with the given id, whether or not it is active.
    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CheckoutError>;

    /// Fetches the material with the given id, whether or not it is active.
    async fn fetch_material(&self, material_id: i64) -> Result<Option<Material>, CheckoutError>;
}
