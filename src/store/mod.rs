//! Persistence seams.
//!
//! `CheckoutStore` is everything the order path reads and writes;
//! `StorefrontStore` adds the catalog reads and the cart, address book,
//! wishlist and order history operations behind the HTTP API. Every query on
//! user data is scoped by user id.

pub mod postgres;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{
    Address, CartLine, Category, NewAddress, NewOrderLine, Order, OrderWithLines, Page, Product, ProductQuery,
    ProductSnapshot, WishlistAdd, WishlistItem,
};
use crate::domain::value_objects::PaymentReference;

pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("an order already exists for payment reference {0}")]
    DuplicatePaymentReference(PaymentReference),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("store call timed out")]
    Timeout,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn cart_lines(&self, user_id: Uuid) -> StoreResult<Vec<CartLine>>;

    async fn products_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<ProductSnapshot>>;

    /// The address only if it belongs to `user_id`.
    async fn address(&self, id: Uuid, user_id: Uuid) -> StoreResult<Option<Address>>;

    async fn order_by_payment_reference(&self, reference: &PaymentReference) -> StoreResult<Option<Order>>;

    /// Inserts the order and its lines and clears the owner's cart, all or nothing.
    ///
    /// Fails with `DuplicatePaymentReference` when another order already
    /// carries the same payment reference.
    ///
    /// The commit may land even when the caller stops waiting, so callers do
    /// not put their own deadline around this call.
    async fn place_order(&self, order: &Order, lines: Vec<NewOrderLine>) -> StoreResult<Uuid>;
}

#[async_trait]
pub trait StorefrontStore: CheckoutStore {
    async fn categories(&self) -> StoreResult<Vec<Category>>;
    async fn category(&self, id: Uuid) -> StoreResult<Option<Category>>;
    /// One page of matching products, newest first, with the total match count.
    async fn products(&self, query: &ProductQuery) -> StoreResult<Page<Product>>;
    async fn product(&self, id: Uuid) -> StoreResult<Option<Product>>;

    /// Adds `quantity` to the line for (product, size), creating it if needed.
    async fn add_cart_line(&self, user_id: Uuid, line: CartLine) -> StoreResult<CartLine>;
    async fn set_cart_quantity(&self, user_id: Uuid, product_id: Uuid, size: Option<&str>, quantity: i32) -> StoreResult<Option<CartLine>>;
    async fn remove_cart_line(&self, user_id: Uuid, product_id: Uuid, size: Option<&str>) -> StoreResult<bool>;
    async fn clear_cart(&self, user_id: Uuid) -> StoreResult<u64>;

    /// Default address first, then oldest first.
    async fn addresses(&self, user_id: Uuid) -> StoreResult<Vec<Address>>;
    /// Clears `is_default` on the user's other addresses when the new one is default.
    async fn insert_address(&self, user_id: Uuid, address: NewAddress) -> StoreResult<Address>;
    async fn set_default_address(&self, user_id: Uuid, id: Uuid) -> StoreResult<Option<Address>>;
    async fn delete_address(&self, user_id: Uuid, id: Uuid) -> StoreResult<bool>;

    async fn wishlist(&self, user_id: Uuid) -> StoreResult<Vec<WishlistItem>>;
    async fn add_to_wishlist(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<WishlistAdd>;
    async fn remove_from_wishlist(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool>;

    /// Newest first.
    async fn orders(&self, user_id: Uuid) -> StoreResult<Vec<Order>>;
    async fn order_with_lines(&self, user_id: Uuid, order_id: Uuid) -> StoreResult<Option<OrderWithLines>>;
}
