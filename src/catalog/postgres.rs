use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use crate::catalog::ProductCatalog;
use crate::domain::aggregates::Product;
use crate::error::{CartError, Result};

const PRODUCT_COLUMNS: &str = "SELECT p.id, p.name, COALESCE(p.wholesale_price, p.price) AS price, p.items_per_pack, p.stock, p.status, c.name AS category_name, p.image FROM products p LEFT JOIN categories c ON c.id = p.category_id";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    price: Decimal,
    items_per_pack: i32,
    stock: i32,
    status: String,
    category_name: Option<String>,
    image: Option<String>,
}

impl TryFrom<ProductRow> for Product {
    type Error = CartError;
    fn try_from(r: ProductRow) -> Result<Self> {
        let status = r.status.parse().map_err(|e| CartError::Storage(format!("product {}: {e}", r.id)))?;
        Ok(Product {
            id: r.id, name: r.name, price: r.price, items_per_pack: r.items_per_pack.max(1) as u32,
            stock: r.stock, status, category_name: r.category_name, image: r.image,
        })
    }
}

/// Reads the storefront's `products` table.
#[derive(Clone)]
pub struct PgCatalog { db: PgPool }

impl PgCatalog {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

#[async_trait]
impl ProductCatalog for PgCatalog {
    async fn product(&self, id: i64) -> Result<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_COLUMNS} WHERE p.id = $1"))
            .bind(id).fetch_optional(&self.db).await?
            .map(Product::try_from).transpose()
    }

    async fn products(&self, ids: &[i64]) -> Result<Vec<Product>> {
        if ids.is_empty() { return Ok(vec![]); }
        sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_COLUMNS} WHERE p.id = ANY($1)"))
            .bind(ids).fetch_all(&self.db).await?
            .into_iter().map(Product::try_from).collect()
    }
}
