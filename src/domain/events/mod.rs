//! Domain events
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    ItemAdded { session_id: i64, line_id: i64, product_id: i64, quantity: u32 },
    QuantitySet { session_id: i64, line_id: i64, quantity: u32 },
    LineRemoved { session_id: i64, line_id: i64 },
    Cleared { session_id: i64, removed: u64 },
}

impl CartEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::ItemAdded { .. } => "cart.item_added",
            Self::QuantitySet { .. } => "cart.quantity_set",
            Self::LineRemoved { .. } => "cart.line_removed",
            Self::Cleared { .. } => "cart.cleared",
        }
    }
}
