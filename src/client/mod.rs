//! Client side of the cart: the transport seam and the cart cache UI code reads from.

use async_trait::async_trait;
use crate::error::ApiFailure;
use crate::service::{CartListing, CartService};
use crate::session::SessionContext;

mod cache;
mod debounce;
mod http;
mod identity;

pub use cache::{CartCache, RowState};
pub use debounce::DebounceRegistry;
pub use http::HttpCartApi;
pub use identity::{CustomerIdentity, IdentityHandle};

/// Result of a successful add.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddedLine {
    pub session_token: String,
    pub line_id: i64,
    /// Quantity now stored on the line, after merging with any existing one.
    pub quantity: u32,
}

/// The four cart operations as a client consumes them.
#[async_trait]
pub trait CartApi: Send + Sync + 'static {
    async fn list_cart(&self, ctx: &SessionContext) -> Result<CartListing, ApiFailure>;
    async fn add_to_cart(&self, ctx: &SessionContext, product_id: i64, quantity: u32) -> Result<AddedLine, ApiFailure>;
    async fn set_quantity(&self, ctx: &SessionContext, line_id: i64, quantity: u32) -> Result<(), ApiFailure>;
    async fn clear_cart(&self, ctx: &SessionContext) -> Result<(), ApiFailure>;
}

/// In-process transport: the service answers directly, failures become envelopes.
#[async_trait]
impl CartApi for CartService {
    async fn list_cart(&self, ctx: &SessionContext) -> Result<CartListing, ApiFailure> {
        Ok(self.list(ctx).await?)
    }

    async fn add_to_cart(&self, ctx: &SessionContext, product_id: i64, quantity: u32) -> Result<AddedLine, ApiFailure> {
        let (session, line) = self.add(ctx, product_id, quantity).await?;
        Ok(AddedLine { session_token: session.token, line_id: line.id, quantity: line.quantity })
    }

    async fn set_quantity(&self, ctx: &SessionContext, line_id: i64, quantity: u32) -> Result<(), ApiFailure> {
        Ok(CartService::set_quantity(self, ctx, line_id, quantity).await?)
    }

    async fn clear_cart(&self, ctx: &SessionContext) -> Result<(), ApiFailure> {
        Ok(self.clear(ctx).await?)
    }
}
