//! Value Objects for the cart

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of the deterministic token a logged-in customer resolves to.
pub const CUSTOMER_TOKEN_PREFIX: &str = "customer_";

pub const MAX_TOKEN_LEN: usize = 128;

/// Cart session token value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    /// Trims the raw value. Blank input yields `Ok(None)`: the caller supplied no token.
    pub fn parse(value: &str) -> Result<Option<Self>, TokenError> {
        let value = value.trim();
        if value.is_empty() { return Ok(None); }
        if value.len() > MAX_TOKEN_LEN { return Err(TokenError::TooLong); }
        Ok(Some(Self(value.to_string())))
    }

    pub fn for_customer(customer_id: i64) -> Self { Self(format!("{CUSTOMER_TOKEN_PREFIX}{customer_id}")) }

    /// Random token for an anonymous shopper.
    pub fn anonymous() -> Self { Self(uuid::Uuid::new_v4().simple().to_string()) }

    pub fn as_str(&self) -> &str { &self.0 }
    pub fn is_customer(&self) -> bool { self.0.starts_with(CUSTOMER_TOKEN_PREFIX) }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum TokenError { TooLong }
impl std::error::Error for TokenError {}
impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "session token longer than {MAX_TOKEN_LEN} characters") }
}

/// Money value object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn zero() -> Self { Self(Decimal::ZERO) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn add(&self, other: &Money) -> Money { Money(self.0 + other.0) }
    pub fn multiply(&self, qty: u32) -> Money { Money(self.0 * Decimal::from(qty)) }
}

impl Default for Money { fn default() -> Self { Self::zero() } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.2}", self.0) }
}

/// Quantity value object.
///
/// Zero is a valid *request* value (it means "delete this line") but never a stored one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub const MAX: u32 = 9_999;

    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn is_zero(&self) -> bool { self.0 == 0 }

    /// Accumulates an Add onto an existing line. `None` past [`Quantity::MAX`].
    pub fn checked_add(&self, other: u32) -> Option<Self> {
        self.0.checked_add(other).filter(|v| *v <= Self::MAX).map(Self)
    }

    /// Parses a numeric input field. An emptied field reads as zero, which deletes the line.
    pub fn parse_input(raw: &str) -> Result<Self, QuantityError> {
        let raw = raw.trim();
        if raw.is_empty() { return Ok(Self(0)); }
        let value: u32 = raw.parse().map_err(|_| QuantityError::NotANumber)?;
        if value > Self::MAX { return Err(QuantityError::TooLarge); }
        Ok(Self(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { NotANumber, TooLarge }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber => write!(f, "quantity must be a whole number"),
            Self::TooLarge => write!(f, "quantity above {}", Quantity::MAX),
        }
    }
}
