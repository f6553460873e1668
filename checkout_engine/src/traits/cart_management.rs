use crate::{
    checkout_api::errors::CheckoutError,
    db_types::{Address, Cart, CartLine},
};

#[allow(async_fn_in_trait)]
pub trait CartManagement {
    async fn fetch_cart(&self, cart_id: i64) -> Result<Option<Cart>, CheckoutError>;

    /// Returns the lines of the cart, in insertion order. An unknown cart has no lines.
    async fn fetch_cart_lines(&self, cart_id: i64) -> Result<Vec<CartLine>, CheckoutError>;

    async fn fetch_address(&self, address_id: i64) -> Result<Option<Address>, CheckoutError>;
}
