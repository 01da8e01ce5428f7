//! Storefront Checkout
//!
//! Backend for a small storefront: cart, address book, wishlist, order
//! history, and the two ways to turn a cart into an order.
//!
//! ## Features
//! - Cash-on-delivery orders
//! - Stripe PaymentIntent checkout with idempotent finalization
//! - Order lines frozen at checkout prices
//! - Optional `storefront.orders.placed` events over NATS

// =============================================================================
// Modules
// =============================================================================

pub mod api;
pub mod auth;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use api::{router, AppState};
pub use checkout::{CheckoutError, CheckoutService};
pub use config::{AppConfig, CheckoutConfig, ConfigError};
pub use domain::value_objects::{Money, PaymentReference};
pub use gateway::{PaymentGateway, StripeGateway};
pub use store::{CheckoutStore, PgStore, StoreError, StorefrontStore};
