//! Order creation and payment finalization.
//!
//! Three entry points share one cart snapshot loader and one address check:
//!
//! - [`CheckoutService::create_cod_order`] places a cash-on-delivery order.
//! - [`CheckoutService::create_payment_intent`] sizes a gateway intent to the
//!   cart and tags it with the user and address.
//! - [`CheckoutService::finalize_gateway_order`] turns a succeeded intent into
//!   an order, at most once per payment reference.
//!
//! Every order is written together with its lines and the cart clear in one
//! store call, so a failure leaves neither a half-written order nor a cleared
//! cart behind.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::time::timeout;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::CheckoutConfig;
use crate::domain::aggregates::{Address, CartSnapshot, Order};
use crate::domain::events::{EventPublisher, OrderEvent};
use crate::domain::value_objects::{Money, PaymentReference};
use crate::gateway::{GatewayError, GatewayResult, IntentMetadata, PaymentGateway};
use crate::store::{CheckoutStore, StoreError, StoreResult};

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("address not found")]
    InvalidAddress,

    #[error("cart is empty")]
    EmptyCart,

    #[error("payment has not succeeded")]
    PaymentNotSucceeded,

    #[error("payment does not belong to this checkout")]
    MetadataMismatch,

    #[error("captured amount {captured} does not match cart total {expected}")]
    AmountMismatch { captured: i64, expected: i64 },

    #[error("order amount out of range")]
    AmountOutOfRange,

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("payment gateway failure: {0}")]
    Gateway(#[from] GatewayError),
}

impl CheckoutError {
    /// Caller mistakes, as opposed to store or gateway trouble.
    pub fn is_validation(&self) -> bool { !matches!(self, Self::Persistence(_) | Self::Gateway(_)) }
}

pub type CheckoutResult<T> = std::result::Result<T, CheckoutError>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentIntentCreated {
    pub client_secret: String,
    pub payment_reference: PaymentReference,
    pub amount: Money,
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FinalizedOrder {
    pub order_id: Uuid,
    /// The order already existed for this payment reference; nothing was written.
    pub replayed: bool,
}

pub struct CheckoutService {
    store: Arc<dyn CheckoutStore>,
    gateway: Arc<dyn PaymentGateway>,
    events: EventPublisher,
    config: CheckoutConfig,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn CheckoutStore>, gateway: Arc<dyn PaymentGateway>, events: EventPublisher, config: CheckoutConfig) -> Self {
        Self { store, gateway, events, config }
    }

    pub fn currency(&self) -> &str { &self.config.currency }

    /// The user's cart joined with current catalog prices. Read-only; an
    /// empty cart is a valid snapshot.
    pub async fn load_cart(&self, user_id: Uuid) -> CheckoutResult<CartSnapshot> {
        let lines = self.store_call(self.store.cart_lines(user_id)).await?;
        let mut ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let products = self.store_call(self.store.products_by_ids(&ids)).await?;
        Ok(CartSnapshot::assemble(lines, products))
    }

    pub async fn validate_address(&self, address_id: Uuid, user_id: Uuid) -> CheckoutResult<Address> {
        self.store_call(self.store.address(address_id, user_id)).await?.ok_or(CheckoutError::InvalidAddress)
    }

    #[instrument(skip(self))]
    pub async fn create_cod_order(&self, user_id: Uuid, address_id: Uuid) -> CheckoutResult<Uuid> {
        self.validate_address(address_id, user_id).await?;
        let cart = self.checkout_cart(user_id).await?;

        let order = Order::cash_on_delivery(user_id, address_id, cart.subtotal());
        let order_id = self.store.place_order(&order, cart.to_order_lines()).await?;
        info!(%order_id, amount = %order.amount, lines = cart.lines().len(), "COD order placed");
        self.events.publish(&OrderEvent::placed(&order)).await;
        Ok(order_id)
    }

    #[instrument(skip(self))]
    pub async fn create_payment_intent(&self, user_id: Uuid, address_id: Uuid) -> CheckoutResult<PaymentIntentCreated> {
        self.validate_address(address_id, user_id).await?;
        let cart = self.checkout_cart(user_id).await?;
        let amount_minor = cart.subtotal().to_minor_units().ok_or(CheckoutError::AmountOutOfRange)?;

        let metadata = IntentMetadata { user_id, address_id };
        let created = self.gateway_call(self.gateway.create_intent(amount_minor, &self.config.currency, metadata)).await?;
        info!(payment_reference = %created.reference, amount_minor, "payment intent created");
        Ok(PaymentIntentCreated {
            client_secret: created.client_secret,
            payment_reference: created.reference,
            amount: cart.subtotal(),
            amount_minor,
            currency: self.config.currency.clone(),
        })
    }

    #[instrument(skip(self), fields(payment_reference = %reference))]
    pub async fn finalize_gateway_order(&self, user_id: Uuid, address_id: Uuid, reference: PaymentReference) -> CheckoutResult<FinalizedOrder> {
        let intent = self.gateway_call(self.gateway.retrieve_intent(&reference)).await?;
        if !intent.succeeded() {
            warn!(status = %intent.status, "finalize called for an unpaid intent");
            return Err(CheckoutError::PaymentNotSucceeded);
        }
        if !(IntentMetadata { user_id, address_id }).matches(&intent.metadata) {
            warn!("payment intent metadata does not match caller");
            return Err(CheckoutError::MetadataMismatch);
        }

        if let Some(existing) = self.store_call(self.store.order_by_payment_reference(&reference)).await? {
            info!(order_id = %existing.id, "order already placed for payment");
            return Ok(FinalizedOrder { order_id: existing.id, replayed: true });
        }

        let cart = self.checkout_cart(user_id).await?;
        let expected = cart.subtotal().to_minor_units().ok_or(CheckoutError::AmountOutOfRange)?;
        if intent.amount_received != expected {
            if self.config.strict_amount_check {
                warn!(captured = intent.amount_received, expected, "captured amount differs from cart total, rejecting");
                return Err(CheckoutError::AmountMismatch { captured: intent.amount_received, expected });
            }
            warn!(captured = intent.amount_received, expected, "captured amount differs from cart total");
        }

        let order = Order::paid_through_gateway(user_id, address_id, cart.subtotal(), reference.clone());
        match self.store.place_order(&order, cart.to_order_lines()).await {
            Ok(order_id) => {
                info!(%order_id, amount = %order.amount, "gateway order placed");
                self.events.publish(&OrderEvent::placed(&order)).await;
                Ok(FinalizedOrder { order_id, replayed: false })
            }
            // A concurrent finalize for the same payment won the insert.
            Err(StoreError::DuplicatePaymentReference(_)) => {
                let existing = self.store_call(self.store.order_by_payment_reference(&reference)).await?
                    .ok_or(StoreError::DuplicatePaymentReference(reference))?;
                info!(order_id = %existing.id, "order placed by a concurrent finalize");
                Ok(FinalizedOrder { order_id: existing.id, replayed: true })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn checkout_cart(&self, user_id: Uuid) -> CheckoutResult<CartSnapshot> {
        let cart = self.load_cart(user_id).await?;
        if cart.is_checkout_empty() { return Err(CheckoutError::EmptyCart); }
        Ok(cart)
    }

    /// Bounds reads with the external call deadline. Order writes go through
    /// `place_order` directly, bounded by the pool's acquire timeout.
    async fn store_call<T>(&self, call: impl Future<Output = StoreResult<T>>) -> CheckoutResult<T> {
        match timeout(self.config.external_call_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::Timeout.into()),
        }
    }

    async fn gateway_call<T>(&self, call: impl Future<Output = GatewayResult<T>>) -> CheckoutResult<T> {
        match timeout(self.config.external_call_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(GatewayError::Timeout.into()),
        }
    }
}
