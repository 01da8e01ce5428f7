use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::error::ApiResult;
use super::extract::ValidatedJson;
use super::AppState;
use crate::auth::AuthUser;
use crate::domain::value_objects::{Money, PaymentReference};

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub address_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FinalizeRequest {
    pub address_id: Uuid,
    pub payment_reference: PaymentReference,
}

#[derive(Debug, Serialize)]
pub struct OrderPlacedResponse {
    pub order_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub payment_reference: PaymentReference,
    pub amount: Money,
    pub currency: String,
}

pub async fn cash_on_delivery(State(s): State<AppState>, user: AuthUser, ValidatedJson(r): ValidatedJson<CheckoutRequest>) -> ApiResult<(StatusCode, Json<OrderPlacedResponse>)> {
    let order_id = s.checkout.create_cod_order(user.user_id, r.address_id).await?;
    Ok((StatusCode::CREATED, Json(OrderPlacedResponse { order_id })))
}

pub async fn payment_intent(State(s): State<AppState>, user: AuthUser, ValidatedJson(r): ValidatedJson<CheckoutRequest>) -> ApiResult<Json<PaymentIntentResponse>> {
    let created = s.checkout.create_payment_intent(user.user_id, r.address_id).await?;
    Ok(Json(PaymentIntentResponse {
        client_secret: created.client_secret,
        payment_reference: created.payment_reference,
        amount: created.amount,
        currency: created.currency,
    }))
}

/// 201 when this call placed the order, 200 when it already existed.
pub async fn finalize(State(s): State<AppState>, user: AuthUser, ValidatedJson(r): ValidatedJson<FinalizeRequest>) -> ApiResult<(StatusCode, Json<OrderPlacedResponse>)> {
    let done = s.checkout.finalize_gateway_order(user.user_id, r.address_id, r.payment_reference).await?;
    let status = if done.replayed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(OrderPlacedResponse { order_id: done.order_id })))
}
