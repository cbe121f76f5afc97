//! Cart persistence
//!
//! Two tables back the cart: `cart_sessions(id, token, created_at)` with a
//! unique token, and `cart(id, session_id, product_id, quantity, created_at)`
//! with one row per `(session_id, product_id)`. Every line operation is
//! scoped by `session_id`, so a line id from another session behaves exactly
//! like a missing one.

use async_trait::async_trait;
use crate::domain::aggregates::{CartLine, CartSession};
use crate::error::Result;

mod memory;
mod postgres;

pub use memory::MemoryCartStore;
pub use postgres::PgCartStore;

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Atomic find-or-create on the unique token.
    async fn find_or_create_session(&self, token: &str) -> Result<CartSession>;

    /// Lines of a session, newest first.
    async fn lines(&self, session_id: i64) -> Result<Vec<CartLine>>;

    /// Inserts the line or increments an existing one by `quantity`.
    async fn add_line(&self, session_id: i64, product_id: i64, quantity: u32) -> Result<CartLine>;

    /// Overwrites the quantity (`quantity >= 1`). `None` when the session owns no such line.
    async fn set_line_quantity(&self, session_id: i64, line_id: i64, quantity: u32) -> Result<Option<CartLine>>;

    /// Deletes the line and purges any of the session's lines with quantity <= 0.
    /// Returns whether the named line existed.
    async fn delete_line(&self, session_id: i64, line_id: i64) -> Result<bool>;

    /// Deletes every line of the session, returning how many were removed.
    async fn clear(&self, session_id: i64) -> Result<u64>;
}
