//! Freezes live catalog prices into order line snapshots.
//!
//! For every cart line, the product and material are re-fetched from the catalog. This is the only place where we
//! decide whether a cart can still be bought: a product or material that has been removed or deactivated since it
//! was added to the cart fails the whole resolution.
//!
//! Prices are per unit:
//!
//! ```text
//!   unit_price = product.base_price + material.price
//!   line_total = unit_price * quantity
//!   subtotal   = Σ line_total
//! ```
//!
//! There is no tax or shipping, so `total == subtotal`.
use checkout_common::Money;
use log::*;

use crate::{
    checkout_api::errors::PricingError,
    db_types::{CartLine, NewOrderLine},
    traits::CatalogLookup,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSnapshot {
    pub lines: Vec<NewOrderLine>,
    pub subtotal: Money,
    pub total: Money,
}

pub struct PriceSnapshotResolver<'a, C> {
    catalog: &'a C,
}

impl<'a, C> PriceSnapshotResolver<'a, C>
where C: CatalogLookup
{
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    pub async fn resolve(&self, cart_lines: &[CartLine]) -> Result<PriceSnapshot, PricingError> {
        let mut lines = Vec::with_capacity(cart_lines.len());
        let mut subtotal = Money::from(0);
        for line in cart_lines {
            let snapshot = self.resolve_line(line).await?;
            subtotal = subtotal.checked_add(snapshot.line_total)?;
            lines.push(snapshot);
        }
        trace!("🧾️ Resolved {} cart lines. Subtotal: {subtotal}", lines.len());
        Ok(PriceSnapshot { lines, subtotal, total: subtotal })
    }

    async fn resolve_line(&self, line: &CartLine) -> Result<NewOrderLine, PricingError> {
        if line.quantity < 1 {
            return Err(PricingError::InvalidQuantity { line_id: line.id, quantity: line.quantity });
        }
        let product = self
            .catalog
            .fetch_product(line.product_id)
            .await
            .map_err(|e| PricingError::CatalogUnavailable(e.to_string()))?
            .filter(|p| p.is_active)
            .ok_or(PricingError::StaleReference { line_id: line.id, kind: "product", id: line.product_id })?;
        let material = self
            .catalog
            .fetch_material(line.material_id)
            .await
            .map_err(|e| PricingError::CatalogUnavailable(e.to_string()))?
            .filter(|m| m.is_active)
            .ok_or(PricingError::StaleReference { line_id: line.id, kind: "material", id: line.material_id })?;
        let unit_price = product.base_price.checked_add(material.price)?;
        let line_total = unit_price.checked_mul(line.quantity)?;
        Ok(NewOrderLine {
            product_id: product.id,
            material_id: material.id,
            product_name: product.name,
            base_price: product.base_price,
            material_price: material.price,
            unit_price,
            quantity: line.quantity,
            line_total,
        })
    }
}
