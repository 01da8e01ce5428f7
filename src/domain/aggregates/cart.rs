//! Cart Aggregate
//!
//! A cart is only ever read as a snapshot: the user's cart rows joined with
//! the catalog as it looks right now.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use crate::domain::aggregates::order::NewOrderLine;
use crate::domain::value_objects::Money;

/// Name recorded on an order line whose product has left the catalog.
pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: Option<String>,
}

/// Catalog projection copied into order lines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SnapshotLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub size: Option<String>,
    pub product: Option<ProductSnapshot>,
}

impl SnapshotLine {
    pub fn name(&self) -> &str { self.product.as_ref().map(|p| p.name.as_str()).unwrap_or(UNKNOWN_PRODUCT_NAME) }
    pub fn unit_price(&self) -> Money { self.product.as_ref().map(|p| p.unit_price).unwrap_or(Money::ZERO) }
    pub fn image_url(&self) -> Option<&str> { self.product.as_ref().and_then(|p| p.image_url.as_deref()) }
    pub fn line_total(&self) -> Money { self.unit_price().multiply(self.quantity) }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CartSnapshot {
    lines: Vec<SnapshotLine>,
    subtotal: Money,
}

impl CartSnapshot {
    /// Joins cart rows with whatever products were found. Rows whose product
    /// is missing keep `product: None` and contribute nothing to the subtotal.
    pub fn assemble(lines: Vec<CartLine>, products: Vec<ProductSnapshot>) -> Self {
        let by_id: HashMap<Uuid, ProductSnapshot> = products.into_iter().map(|p| (p.product_id, p)).collect();
        let lines: Vec<SnapshotLine> = lines
            .into_iter()
            .map(|l| SnapshotLine { product: by_id.get(&l.product_id).cloned(), product_id: l.product_id, quantity: l.quantity, size: l.size })
            .collect();
        let subtotal = lines.iter().map(SnapshotLine::line_total).sum();
        Self { lines, subtotal }
    }

    pub fn lines(&self) -> &[SnapshotLine] { &self.lines }
    pub fn subtotal(&self) -> Money { self.subtotal }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }

    /// Nothing to charge for: no lines, or every line priced at zero.
    pub fn is_checkout_empty(&self) -> bool { self.lines.is_empty() || self.subtotal.is_zero() }

    pub fn to_order_lines(&self) -> Vec<NewOrderLine> {
        self.lines
            .iter()
            .map(|l| NewOrderLine {
                product_id: l.product_id,
                name: l.name().to_string(),
                unit_price: l.unit_price(),
                quantity: l.quantity,
                size: l.size.clone(),
                image_url: l.image_url().map(str::to_string),
            })
            .collect()
    }
}
