//! Stripe PaymentIntents over the REST API (form-encoded, basic auth).

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::{CreatedIntent, GatewayError, GatewayResult, IntentMetadata, PaymentGateway, RetrievedIntent};
use crate::domain::value_objects::PaymentReference;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentBody {
    id: String,
    status: String,
    #[serde(default)]
    amount_received: i64,
    client_secret: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope { error: ErrorBody }

#[derive(Debug, Deserialize)]
struct ErrorBody { message: Option<String> }

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>, timeout: Duration) -> GatewayResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, secret_key: secret_key.into(), api_base: api_base.into().trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String { format!("{}/v1/{}", self.api_base, path) }

    async fn read_intent(response: reqwest::Response) -> GatewayResult<PaymentIntentBody> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(text);
            warn!(status = status.as_u16(), %message, "stripe request rejected");
            return Err(GatewayError::Api { status: status.as_u16(), message });
        }
        response.json::<PaymentIntentBody>().await.map_err(|e| GatewayError::Malformed(e.to_string()))
    }
}

fn reference_of(body: &PaymentIntentBody) -> GatewayResult<PaymentReference> {
    PaymentReference::new(body.id.as_str()).map_err(|e| GatewayError::Malformed(format!("payment intent id: {e}")))
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, metadata), fields(user_id = %metadata.user_id))]
    async fn create_intent(&self, amount_minor: i64, currency: &str, metadata: IntentMetadata) -> GatewayResult<CreatedIntent> {
        let mut form = vec![
            ("amount".to_string(), amount_minor.to_string()),
            ("currency".to_string(), currency.to_lowercase()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
        ];
        form.extend(metadata.to_pairs().into_iter().map(|(k, v)| (format!("metadata[{k}]"), v)));

        let response = self.client.post(self.url("payment_intents")).basic_auth(&self.secret_key, None::<&str>).form(&form).send().await?;
        let body = Self::read_intent(response).await?;
        let reference = reference_of(&body)?;
        let client_secret = body.client_secret.ok_or_else(|| GatewayError::Malformed("payment intent without client_secret".into()))?;
        info!(payment_reference = %reference, "payment intent created");
        Ok(CreatedIntent { reference, client_secret })
    }

    #[instrument(skip(self))]
    async fn retrieve_intent(&self, reference: &PaymentReference) -> GatewayResult<RetrievedIntent> {
        let response = self.client.get(self.url(&format!("payment_intents/{reference}"))).basic_auth(&self.secret_key, None::<&str>).send().await?;
        let body = Self::read_intent(response).await?;
        Ok(RetrievedIntent { reference: reference_of(&body)?, status: body.status, amount_received: body.amount_received, metadata: body.metadata })
    }
}
