//! Aggregates module
pub mod address;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod wishlist;

pub use address::{Address, NewAddress};
pub use catalog::{Category, Page, Product, ProductQuery};
pub use cart::{CartLine, CartSnapshot, ProductSnapshot, SnapshotLine, UNKNOWN_PRODUCT_NAME};
pub use order::{NewOrderLine, Order, OrderLine, OrderStatus, OrderWithLines, PaymentMethod, PaymentStatus};
pub use wishlist::{WishlistAdd, WishlistItem};
