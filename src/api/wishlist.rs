use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::error::{ApiError, ApiResult};
use super::extract::ValidatedJson;
use super::AppState;
use crate::auth::AuthUser;
use crate::domain::aggregates::{WishlistAdd, WishlistItem};
use crate::store::StorefrontStore;

#[derive(Debug, Deserialize, Validate)]
pub struct WishlistRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct WishlistAddResponse {
    pub product_id: Uuid,
    pub added: bool,
}

pub async fn list(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<WishlistItem>>> {
    Ok(Json(s.store.wishlist(user.user_id).await?))
}

/// Adding a product that is already listed answers 200 instead of 201.
pub async fn add(State(s): State<AppState>, user: AuthUser, ValidatedJson(r): ValidatedJson<WishlistRequest>) -> ApiResult<(StatusCode, Json<WishlistAddResponse>)> {
    let outcome = s.store.add_to_wishlist(user.user_id, r.product_id).await?;
    let (status, added) = match outcome {
        WishlistAdd::Added => (StatusCode::CREATED, true),
        WishlistAdd::AlreadyPresent => (StatusCode::OK, false),
    };
    Ok((status, Json(WishlistAddResponse { product_id: r.product_id, added })))
}

pub async fn remove(State(s): State<AppState>, user: AuthUser, Path(product_id): Path<Uuid>) -> ApiResult<StatusCode> {
    if s.store.remove_from_wishlist(user.user_id, product_id).await? { Ok(StatusCode::NO_CONTENT) } else { Err(ApiError::NotFound("wishlist item")) }
}
