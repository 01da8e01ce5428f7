use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::error::{ApiError, ApiResult};
use super::extract::ValidatedJson;
use super::AppState;
use crate::auth::AuthUser;
use crate::domain::aggregates::{Address, NewAddress};
use crate::store::StorefrontStore;

#[derive(Debug, Deserialize, Validate)]
pub struct AddressRequest {
    #[validate(length(max = 100), custom = "not_blank")]
    pub recipient_name: String,
    #[validate(length(min = 10, max = 15), custom = "phone_digits")]
    pub phone: String,
    #[validate(length(max = 200), custom = "not_blank")]
    pub line1: String,
    #[validate(length(max = 200))]
    pub line2: Option<String>,
    #[validate(length(max = 100), custom = "not_blank")]
    pub city: String,
    #[validate(length(max = 100), custom = "not_blank")]
    pub state: String,
    #[validate(custom = "six_digit_pincode")]
    pub pincode: String,
    #[serde(default)]
    pub is_default: bool,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() { return Err(ValidationError::new("blank")); }
    Ok(())
}

fn phone_digits(value: &str) -> Result<(), ValidationError> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) { return Err(ValidationError::new("phone")); }
    Ok(())
}

fn six_digit_pincode(value: &str) -> Result<(), ValidationError> {
    if value.len() != 6 || !value.chars().all(|c| c.is_ascii_digit()) { return Err(ValidationError::new("pincode")); }
    Ok(())
}

impl From<AddressRequest> for NewAddress {
    fn from(r: AddressRequest) -> Self {
        Self {
            recipient_name: r.recipient_name.trim().to_string(),
            phone: r.phone,
            line1: r.line1.trim().to_string(),
            line2: r.line2.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
            city: r.city.trim().to_string(),
            state: r.state.trim().to_string(),
            pincode: r.pincode,
            is_default: r.is_default,
        }
    }
}

pub async fn list(State(s): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Address>>> {
    Ok(Json(s.store.addresses(user.user_id).await?))
}

pub async fn create(State(s): State<AppState>, user: AuthUser, ValidatedJson(r): ValidatedJson<AddressRequest>) -> ApiResult<(StatusCode, Json<Address>)> {
    let address = s.store.insert_address(user.user_id, r.into()).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

pub async fn make_default(State(s): State<AppState>, user: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<Address>> {
    s.store.set_default_address(user.user_id, id).await?.map(Json).ok_or(ApiError::NotFound("address"))
}

pub async fn remove(State(s): State<AppState>, user: AuthUser, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    if s.store.delete_address(user.user_id, id).await? { Ok(StatusCode::NO_CONTENT) } else { Err(ApiError::NotFound("address")) }
}
