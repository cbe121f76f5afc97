//! Cart sessions, stored lines, and the priced item view

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::{Product, ProductStatus};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSession {
    pub id: i64,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

/// A stored `(session, product) -> quantity` row. Quantity is always >= 1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: i64,
    pub session_id: i64,
    pub product_id: i64,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
}

/// A cart line joined with the live product fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub line_id: i64,
    pub product_id: i64,
    pub quantity: u32,
    pub name: String,
    pub price: Decimal,
    pub items_per_pack: u32,
    pub stock: i32,
    pub status: ProductStatus,
    pub category_name: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    pub fn from_parts(line: &CartLine, product: &Product) -> Self {
        Self {
            line_id: line.id, product_id: line.product_id, quantity: line.quantity,
            name: product.name.clone(), price: product.price, items_per_pack: product.items_per_pack,
            stock: product.stock, status: product.status, category_name: product.category_name.clone(),
            image: product.image.clone(), created_at: line.created_at,
        }
    }

    /// price x quantity x items per pack
    pub fn line_total(&self) -> Money {
        Money::new(self.price).multiply(self.quantity).multiply(self.items_per_pack)
    }
}
