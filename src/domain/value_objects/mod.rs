//! Value Objects for checkout

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Gateway payment reference (e.g. a Stripe PaymentIntent id), used as the
/// idempotency key for gateway orders.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentReference(String);

impl PaymentReference {
    pub fn new(value: impl Into<String>) -> Result<Self, PaymentReferenceError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(PaymentReferenceError::Empty); }
        if value.len() > 255 { return Err(PaymentReferenceError::TooLong); }
        if value.chars().any(|c| c.is_whitespace() || c == '/') { return Err(PaymentReferenceError::InvalidCharacter); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for PaymentReference {
    type Error = PaymentReferenceError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<PaymentReference> for String {
    fn from(value: PaymentReference) -> Self { value.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum PaymentReferenceError { Empty, TooLong, InvalidCharacter }
impl std::error::Error for PaymentReferenceError {}
impl fmt::Display for PaymentReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "payment reference empty"),
            Self::TooLong => write!(f, "payment reference too long"),
            Self::InvalidCharacter => write!(f, "payment reference contains an invalid character"),
        }
    }
}

/// Money value object in the store currency.
///
/// Amounts are never negative: a missing or negative catalog price becomes zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self { Self(amount.max(Decimal::ZERO)) }
    pub fn from_price(price: Option<Decimal>) -> Self { price.map(Self::new).unwrap_or(Self::ZERO) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }
    pub fn multiply(&self, qty: i32) -> Money { Money::new(self.0 * Decimal::from(qty.max(0))) }

    /// Amount in the currency's smallest unit, rounded half away from zero.
    pub fn to_minor_units(&self) -> Option<i64> {
        (self.0 * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, other: Money) -> Money { Money(self.0 + other.0) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, |acc, m| acc + m) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
