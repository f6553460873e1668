//! Value types shared by every crate in the checkout workspace.
//!
//! * [`Money`] is the only representation of a monetary amount. It is a fixed-point count of minor currency units
//!   (e.g. cents), so there is never any floating point involved in pricing.
//! * [`Secret`] wraps configuration values that must not end up in logs.
pub mod helpers;
mod money;
pub mod op;
mod secret;

pub use money::{Money, MoneyOverflowError, DEFAULT_CURRENCY_CODE};
pub use secret::Secret;
