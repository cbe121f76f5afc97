use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use crate::catalog::ProductCatalog;
use crate::domain::aggregates::{Product, ProductStatus};
use crate::error::Result;

/// In-process catalog for tests and database-less runs.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: RwLock<HashMap<i64, Product>>,
}

impl MemoryCatalog {
    pub fn new() -> Self { Self::default() }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self { products: RwLock::new(products.into_iter().map(|p| (p.id, p)).collect()) }
    }

    pub async fn upsert(&self, product: Product) { self.products.write().await.insert(product.id, product); }

    pub async fn set_status(&self, id: i64, status: ProductStatus) -> bool {
        match self.products.write().await.get_mut(&id) {
            Some(p) => { p.status = status; true }
            None => false,
        }
    }

    pub async fn remove(&self, id: i64) -> Option<Product> { self.products.write().await.remove(&id) }
}

#[async_trait]
impl ProductCatalog for MemoryCatalog {
    async fn product(&self, id: i64) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn products(&self, ids: &[i64]) -> Result<Vec<Product>> {
        let products = self.products.read().await;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }
}
