//! Order Aggregate
//!
//! Orders are append-only: a `NewOrder` is built from a cart snapshot, written
//! once together with its lines, and never updated by this service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::value_objects::{Money, PaymentReference};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod { Cod, Gateway }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus { Paid }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus { #[default] Placed, Cancelled }

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str { match self { Self::Cod => "COD", Self::Gateway => "GATEWAY" } }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str { match self { Self::Paid => "paid" } }
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str { match self { Self::Placed => "PLACED", Self::Cancelled => "CANCELLED" } }
}

impl FromStr for PaymentMethod {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s { "COD" => Ok(Self::Cod), "GATEWAY" => Ok(Self::Gateway), other => Err(UnknownVariant(other.to_string())) }
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s { "paid" => Ok(Self::Paid), other => Err(UnknownVariant(other.to_string())) }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s { "PLACED" => Ok(Self::Placed), "CANCELLED" => Ok(Self::Cancelled), other => Err(UnknownVariant(other.to_string())) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct UnknownVariant(pub String);
impl std::error::Error for UnknownVariant {}
impl std::fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "unknown value '{}'", self.0) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address_id: Uuid,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub payment_status: Option<PaymentStatus>,
    pub payment_reference: Option<PaymentReference>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i32,
    pub size: Option<String>,
    pub image_url: Option<String>,
}

/// Order line before it is attached to a persisted order.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrderLine {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i32,
    pub size: Option<String>,
    pub image_url: Option<String>,
}

impl NewOrderLine {
    pub fn attach(self, order_id: Uuid) -> OrderLine {
        OrderLine { order_id, product_id: self.product_id, name: self.name, unit_price: self.unit_price, quantity: self.quantity, size: self.size, image_url: self.image_url }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderWithLines {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

impl Serialize for OrderWithLines {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Flat<'a> {
            #[serde(flatten)]
            order: &'a Order,
            lines: &'a [OrderLine],
        }
        Flat { order: &self.order, lines: &self.lines }.serialize(serializer)
    }
}

impl Order {
    pub fn cash_on_delivery(user_id: Uuid, address_id: Uuid, amount: Money) -> Self {
        Self::placed(user_id, address_id, amount, PaymentMethod::Cod, None, None)
    }

    pub fn paid_through_gateway(user_id: Uuid, address_id: Uuid, amount: Money, reference: PaymentReference) -> Self {
        Self::placed(user_id, address_id, amount, PaymentMethod::Gateway, Some(PaymentStatus::Paid), Some(reference))
    }

    fn placed(
        user_id: Uuid, address_id: Uuid, amount: Money, payment_method: PaymentMethod,
        payment_status: Option<PaymentStatus>, payment_reference: Option<PaymentReference>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(), user_id, address_id, amount, payment_method, payment_status,
            payment_reference, status: OrderStatus::Placed, created_at: Utc::now(),
        }
    }
}
