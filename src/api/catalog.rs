//! Public catalog reads: category browsing, product search and detail.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::domain::aggregates::{Category, Page, Product, ProductQuery};
use crate::store::StorefrontStore;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<Uuid>,
    pub search: Option<String>,
}

impl From<ListParams> for ProductQuery {
    fn from(p: ListParams) -> Self { ProductQuery::new(p.category, p.search, p.page, p.per_page) }
}

pub async fn list_categories(State(s): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(s.store.categories().await?))
}

pub async fn get_category(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Category>> {
    s.store.category(id).await?.map(Json).ok_or(ApiError::NotFound("category"))
}

pub async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> ApiResult<Json<Page<Product>>> {
    Ok(Json(s.store.products(&p.into()).await?))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Product>> {
    s.store.product(id).await?.map(Json).ok_or(ApiError::NotFound("product"))
}
