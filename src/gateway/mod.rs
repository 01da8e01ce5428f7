//! Payment gateway seam.

pub mod stripe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::PaymentReference;

pub use stripe::StripeGateway;

pub const METADATA_USER_ID: &str = "user_id";
pub const METADATA_ADDRESS_ID: &str = "address_id";
pub const STATUS_SUCCEEDED: &str = "succeeded";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed gateway response: {0}")]
    Malformed(String),

    #[error("gateway call timed out")]
    Timeout,
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Who an intent was created for. Stored on the intent so the finalizer can
/// refuse a payment reference that belongs to another user or address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentMetadata {
    pub user_id: Uuid,
    pub address_id: Uuid,
}

impl IntentMetadata {
    pub fn to_pairs(&self) -> [(&'static str, String); 2] {
        [(METADATA_USER_ID, self.user_id.to_string()), (METADATA_ADDRESS_ID, self.address_id.to_string())]
    }

    pub fn matches(&self, metadata: &HashMap<String, String>) -> bool {
        self.to_pairs().iter().all(|(k, v)| metadata.get(*k) == Some(v))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedIntent {
    pub reference: PaymentReference,
    pub client_secret: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrievedIntent {
    pub reference: PaymentReference,
    pub status: String,
    pub amount_received: i64,
    pub metadata: HashMap<String, String>,
}

impl RetrievedIntent {
    pub fn succeeded(&self) -> bool { self.status == STATUS_SUCCEEDED }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, amount_minor: i64, currency: &str, metadata: IntentMetadata) -> GatewayResult<CreatedIntent>;
    async fn retrieve_intent(&self, reference: &PaymentReference) -> GatewayResult<RetrievedIntent>;
}
