//! Product lookup collaborator
//!
//! The cart never writes products. It asks the catalog for the current price
//! and status whenever it validates an add or prices a listing.

use async_trait::async_trait;
use crate::domain::aggregates::Product;
use crate::error::Result;

mod memory;
mod postgres;

pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn product(&self, id: i64) -> Result<Option<Product>>;

    /// Products for the given ids, in no particular order. Unknown ids are skipped.
    async fn products(&self, ids: &[i64]) -> Result<Vec<Product>>;
}
