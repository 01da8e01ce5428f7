//! HTTP surface. Everything under `/api/v1` except the catalog reads needs
//! the auth cookie.

pub mod addresses;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod extract;
pub mod orders;
pub mod wishlist;

use axum::extract::FromRef;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::TokenVerifier;
use crate::checkout::CheckoutService;
use crate::store::StorefrontStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StorefrontStore>,
    pub checkout: Arc<CheckoutService>,
    pub verifier: Arc<TokenVerifier>,
}

impl FromRef<AppState> for Arc<TokenVerifier> {
    fn from_ref(state: &AppState) -> Self { state.verifier.clone() }
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let api = Router::new()
        .route("/categories", get(catalog::list_categories))
        .route("/categories/:id", get(catalog::get_category))
        .route("/products", get(catalog::list_products))
        .route("/products/:id", get(catalog::get_product))
        .route("/checkout/cod", post(checkout::cash_on_delivery))
        .route("/checkout/payment-intent", post(checkout::payment_intent))
        .route("/checkout/finalize", post(checkout::finalize))
        .route("/cart", get(cart::show).delete(cart::clear))
        .route("/cart/items", post(cart::add_item))
        .route("/cart/items/:product_id", put(cart::set_quantity).delete(cart::remove_item))
        .route("/addresses", get(addresses::list).post(addresses::create))
        .route("/addresses/:id/default", put(addresses::make_default))
        .route("/addresses/:id", delete(addresses::remove))
        .route("/orders", get(orders::list))
        .route("/orders/:id", get(orders::show))
        .route("/wishlist", get(wishlist::list).post(wishlist::add))
        .route("/wishlist/:product_id", delete(wishlist::remove));

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-checkout"})) }))
        .nest("/api/v1", api)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
