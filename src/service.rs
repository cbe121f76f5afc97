//! Cart operations: List, Add, SetQuantity, Clear
//!
//! Add is additive: repeated adds of a product accumulate on one line.
//! SetQuantity is absolute, and setting 0 is the same code path as removing
//! the line.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use crate::catalog::ProductCatalog;
use crate::domain::aggregates::{CartItem, CartLine, CartSession};
use crate::domain::events::CartEvent;
use crate::domain::value_objects::Quantity;
use crate::error::{CartError, Result};
use crate::events::EventPublisher;
use crate::session::{SessionContext, SessionResolver};
use crate::store::CartRepository;

/// Priced cart contents plus the token that identifies the session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CartListing {
    pub session_token: Option<String>,
    pub items: Vec<CartItem>,
}

#[derive(Clone)]
pub struct CartService {
    resolver: SessionResolver,
    repo: Arc<dyn CartRepository>,
    catalog: Arc<dyn ProductCatalog>,
    events: EventPublisher,
}

impl CartService {
    pub fn new(repo: Arc<dyn CartRepository>, catalog: Arc<dyn ProductCatalog>, events: EventPublisher) -> Self {
        Self { resolver: SessionResolver::new(repo.clone()), repo, catalog, events }
    }

    pub fn resolver(&self) -> &SessionResolver { &self.resolver }

    /// Newest-first items of the caller's cart. Lines whose product is gone or
    /// inactive are left out, though their rows remain stored.
    #[instrument(name = "cart::list", skip(self), err)]
    pub async fn list(&self, ctx: &SessionContext) -> Result<CartListing> {
        let Some(session) = self.resolver.resolve(ctx).await? else { return Ok(CartListing::default()) };
        let lines = self.repo.lines(session.id).await?;
        let items = self.price_lines(&lines).await?;
        Ok(CartListing { session_token: Some(session.token), items })
    }

    #[instrument(name = "cart::add", skip(self), err)]
    pub async fn add(&self, ctx: &SessionContext, product_id: i64, quantity: u32) -> Result<(CartSession, CartLine)> {
        if quantity == 0 || quantity > Quantity::MAX {
            return Err(CartError::InvalidRequest(format!("quantity must be between 1 and {}", Quantity::MAX)));
        }
        let session = self.resolver.require(ctx).await?;
        let product = self.catalog.product(product_id).await?.ok_or(CartError::ProductNotFound(product_id))?;
        if !product.is_purchasable() { return Err(CartError::ProductInactive(product_id)); }

        let line = self.repo.add_line(session.id, product_id, quantity).await?;
        info!(session_id = session.id, line_id = line.id, product_id, quantity = line.quantity, "cart line added");
        self.events.publish(CartEvent::ItemAdded { session_id: session.id, line_id: line.id, product_id, quantity: line.quantity }).await;
        Ok((session, line))
    }

    /// Sets the line to exactly `quantity`. Zero deletes the line and is a
    /// no-op success when the line is already gone.
    #[instrument(name = "cart::set_quantity", skip(self), err)]
    pub async fn set_quantity(&self, ctx: &SessionContext, line_id: i64, quantity: u32) -> Result<()> {
        if quantity > Quantity::MAX {
            return Err(CartError::InvalidRequest(format!("quantity above {}", Quantity::MAX)));
        }
        let session = self.resolver.require(ctx).await?;
        if quantity == 0 { return self.delete_line(&session, line_id).await; }

        self.repo.set_line_quantity(session.id, line_id, quantity).await?.ok_or(CartError::LineNotFound(line_id))?;
        info!(session_id = session.id, line_id, quantity, "cart quantity set");
        self.events.publish(CartEvent::QuantitySet { session_id: session.id, line_id, quantity }).await;
        Ok(())
    }

    pub async fn remove(&self, ctx: &SessionContext, line_id: i64) -> Result<()> {
        self.set_quantity(ctx, line_id, 0).await
    }

    #[instrument(name = "cart::clear", skip(self), err)]
    pub async fn clear(&self, ctx: &SessionContext) -> Result<()> {
        let session = self.resolver.require(ctx).await?;
        let removed = self.repo.clear(session.id).await?;
        info!(session_id = session.id, removed, "cart cleared");
        self.events.publish(CartEvent::Cleared { session_id: session.id, removed }).await;
        Ok(())
    }

    async fn delete_line(&self, session: &CartSession, line_id: i64) -> Result<()> {
        if self.repo.delete_line(session.id, line_id).await? {
            info!(session_id = session.id, line_id, "cart line removed");
            self.events.publish(CartEvent::LineRemoved { session_id: session.id, line_id }).await;
        }
        Ok(())
    }

    async fn price_lines(&self, lines: &[CartLine]) -> Result<Vec<CartItem>> {
        if lines.is_empty() { return Ok(vec![]); }
        let ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
        let products: HashMap<i64, _> = self.catalog.products(&ids).await?.into_iter().map(|p| (p.id, p)).collect();
        Ok(lines
            .iter()
            .filter(|l| l.quantity > 0)
            .filter_map(|l| products.get(&l.product_id).filter(|p| p.is_listable()).map(|p| CartItem::from_parts(l, p)))
            .collect())
    }
}
