use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::auth::AuthUser;
use crate::domain::aggregates::{Order, OrderWithLines};
use crate::store::StorefrontStore;

pub async fn list(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(s.store.orders(user.user_id).await?))
}

pub async fn show(State(s): State<AppState>, user: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<OrderWithLines>> {
    s.store.order_with_lines(user.user_id, id).await?.map(Json).ok_or(ApiError::NotFound("order"))
}
