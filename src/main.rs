//! Storefront Checkout - cart, addresses and COD / Stripe checkout over HTTP

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_checkout::auth::TokenVerifier;
use storefront_checkout::domain::events::EventPublisher;
use storefront_checkout::{router, AppConfig, AppState, CheckoutService, PgStore, StripeGateway};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("connecting to postgres")?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, order events disabled");
                None
            }
        },
        None => None,
    };

    let store = Arc::new(PgStore::new(db));
    let gateway = Arc::new(StripeGateway::new(&config.stripe_secret_key, &config.stripe_api_base, config.checkout.external_call_timeout)?);
    let checkout = CheckoutService::new(store.clone(), gateway, EventPublisher::new(nats), config.checkout.clone());
    let state = AppState {
        store,
        checkout: Arc::new(checkout),
        verifier: Arc::new(TokenVerifier::new(&config.jwt_secret, config.auth_cookie_name.as_str())),
    };

    let app = router(state, config.request_timeout);
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("storefront-checkout listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
