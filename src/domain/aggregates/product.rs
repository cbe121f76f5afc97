//! Product read model
//!
//! The catalog owns products; the cart only reads the fields it needs to
//! validate an add and to price a line.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Wholesale rate, or the list price when no wholesale rate is set.
    pub price: Decimal,
    pub items_per_pack: u32,
    pub stock: i32,
    pub status: ProductStatus,
    pub category_name: Option<String>,
    pub image: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus { #[default] Active, Inactive, OutOfStock }

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "active", Self::Inactive => "inactive", Self::OutOfStock => "out_of_stock" }
    }
}

impl FromStr for ProductStatus {
    type Err = ProductStatusError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "out_of_stock" => Ok(Self::OutOfStock),
            other => Err(ProductStatusError(other.to_string())),
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct ProductStatusError(pub String);
impl std::error::Error for ProductStatusError {}
impl fmt::Display for ProductStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown product status '{}'", self.0) }
}

impl Product {
    pub fn is_purchasable(&self) -> bool { self.status == ProductStatus::Active }
    /// Inactive products drop out of cart listings; out-of-stock ones stay visible.
    pub fn is_listable(&self) -> bool { self.status != ProductStatus::Inactive }
    pub fn unit_price(&self) -> Money { Money::new(self.price) }
}
