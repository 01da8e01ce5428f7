use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::error::{ApiError, ApiResult};
use super::extract::ValidatedJson;
use super::AppState;
use crate::auth::AuthUser;
use crate::domain::aggregates::{CartLine, CartSnapshot};
use crate::store::{CheckoutStore, StorefrontStore};

pub const MAX_LINE_QUANTITY: i32 = 100;

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = "MAX_LINE_QUANTITY"))]
    pub quantity: i32,
    #[validate(length(min = 1, max = 16))]
    pub size: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetQuantityRequest {
    #[validate(range(min = 1, max = "MAX_LINE_QUANTITY"))]
    pub quantity: i32,
    #[validate(length(min = 1, max = 16))]
    pub size: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LineSelector {
    pub size: Option<String>,
}

pub async fn show(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<CartSnapshot>> {
    Ok(Json(s.checkout.load_cart(user.user_id).await?))
}

pub async fn clear(State(s): State<AppState>, user: AuthUser) -> ApiResult<StatusCode> {
    let removed = s.store.clear_cart(user.user_id).await?;
    tracing::debug!(user_id = %user.user_id, removed, "cart cleared");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_item(State(s): State<AppState>, user: AuthUser, ValidatedJson(r): ValidatedJson<AddItemRequest>) -> ApiResult<(StatusCode, Json<CartLine>)> {
    let held: i32 = s.store.cart_lines(user.user_id).await?
        .iter()
        .filter(|l| l.product_id == r.product_id && l.size == r.size)
        .map(|l| l.quantity)
        .sum();
    if held + r.quantity > MAX_LINE_QUANTITY {
        return Err(ApiError::Validation(format!("at most {MAX_LINE_QUANTITY} of one item per order")));
    }
    let line = s.store.add_cart_line(user.user_id, CartLine { product_id: r.product_id, quantity: r.quantity, size: r.size }).await?;
    Ok((StatusCode::CREATED, Json(line)))
}

pub async fn set_quantity(State(s): State<AppState>, user: AuthUser, Path(product_id): Path<Uuid>, ValidatedJson(r): ValidatedJson<SetQuantityRequest>) -> ApiResult<Json<CartLine>> {
    s.store.set_cart_quantity(user.user_id, product_id, r.size.as_deref(), r.quantity).await?
        .map(Json)
        .ok_or(ApiError::NotFound("cart line"))
}

pub async fn remove_item(State(s): State<AppState>, user: AuthUser, Path(product_id): Path<Uuid>, Query(selector): Query<LineSelector>) -> ApiResult<StatusCode> {
    if s.store.remove_cart_line(user.user_id, product_id, selector.size.as_deref()).await? { Ok(StatusCode::NO_CONTENT) } else { Err(ApiError::NotFound("cart line")) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_bounded_by_line_cap() {
        let request = |quantity| AddItemRequest { product_id: Uuid::new_v4(), quantity, size: None };
        assert!(request(MAX_LINE_QUANTITY).validate().is_ok());
        assert!(request(MAX_LINE_QUANTITY + 1).validate().is_err());
        assert!(request(0).validate().is_err());
        assert!(SetQuantityRequest { quantity: MAX_LINE_QUANTITY + 1, size: None }.validate().is_err());
    }
}
