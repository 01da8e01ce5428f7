//! Domain events
use crate::domain::aggregates::{Order, PaymentMethod};
use crate::domain::value_objects::Money;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const ORDER_PLACED_SUBJECT: &str = "storefront.orders.placed";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Uuid, amount: Money, payment_method: PaymentMethod, placed_at: DateTime<Utc> },
}

impl OrderEvent {
    pub fn placed(order: &Order) -> Self {
        Self::Placed { order_id: order.id, user_id: order.user_id, amount: order.amount, payment_method: order.payment_method, placed_at: order.created_at }
    }

    pub fn subject(&self) -> &'static str { match self { Self::Placed { .. } => ORDER_PLACED_SUBJECT } }
}

/// Fire-and-forget publisher. Without a NATS client every publish is a no-op.
#[derive(Clone, Default)]
pub struct EventPublisher { nats: Option<async_nats::Client> }

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }
    pub fn disabled() -> Self { Self { nats: None } }

    pub async fn publish(&self, event: &OrderEvent) {
        let Some(client) = &self.nats else { return };
        let payload = match serde_json::to_vec(event) {
            Ok(p) => p,
            Err(e) => { tracing::warn!(error = %e, "failed to encode order event"); return; }
        };
        if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
            tracing::warn!(error = %e, subject = event.subject(), "failed to publish order event");
        }
    }
}
