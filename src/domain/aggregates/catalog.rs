//! Catalog Aggregate (read side)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::cart::ProductSnapshot;
use crate::domain::value_objects::Money;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub price: Money,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot { product_id: self.id, name: self.name.clone(), unit_price: self.price, image_url: self.image_url.clone() }
    }
}

/// Listing filter; `page` is 1-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductQuery {
    pub category: Option<Uuid>,
    pub search: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl ProductQuery {
    /// Clamps paging to 1.. and 1..=100 and drops a blank search term.
    pub fn new(category: Option<Uuid>, search: Option<String>, page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            category,
            search: search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 { u64::from(self.page - 1) * u64::from(self.per_page) }

    pub fn matches(&self, product: &Product) -> bool {
        self.category.map_or(true, |c| product.category_id == Some(c))
            && self.search.as_deref().map_or(true, |s| product.name.to_lowercase().contains(&s.to_lowercase()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_clamps_paging() {
        let q = ProductQuery::new(None, Some("   ".into()), Some(0), Some(500));
        assert_eq!((q.page, q.per_page, q.search), (1, MAX_PAGE_SIZE, None));
        let q = ProductQuery::new(None, None, Some(3), None);
        assert_eq!(q.offset(), 40);
    }

    #[test]
    fn test_query_matches_category_and_name() {
        let shirts = Uuid::new_v4();
        let product = Product { id: Uuid::new_v4(), category_id: Some(shirts), name: "Linen Kurta".into(), price: Money::ZERO, image_url: None, created_at: Utc::now() };
        assert!(ProductQuery::new(Some(shirts), Some("kurta".into()), None, None).matches(&product));
        assert!(!ProductQuery::new(Some(Uuid::new_v4()), None, None, None).matches(&product));
        assert!(!ProductQuery::new(None, Some("saree".into()), None, None).matches(&product));
    }
}
