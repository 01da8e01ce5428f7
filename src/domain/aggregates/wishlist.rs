//! Wishlist Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::cart::ProductSnapshot;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub product: Option<ProductSnapshot>,
}

/// Outcome of adding a product; a second add of the same product is not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WishlistAdd { Added, AlreadyPresent }
