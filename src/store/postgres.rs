use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use crate::domain::aggregates::{CartLine, CartSession};
use crate::domain::value_objects::Quantity;
use crate::error::{CartError, Result};
use crate::store::CartRepository;

#[derive(Debug, sqlx::FromRow)]
struct LineRow { id: i64, session_id: i64, product_id: i64, quantity: i32, created_at: DateTime<Utc> }

impl From<LineRow> for CartLine {
    fn from(r: LineRow) -> Self {
        CartLine { id: r.id, session_id: r.session_id, product_id: r.product_id, quantity: r.quantity.max(0) as u32, created_at: r.created_at }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow { id: i64, token: String, created_at: DateTime<Utc> }

fn db_quantity(quantity: u32) -> Result<i32> {
    i32::try_from(quantity).map_err(|_| CartError::InvalidRequest(format!("quantity {quantity} out of range")))
}

#[derive(Clone)]
pub struct PgCartStore { db: PgPool }

impl PgCartStore {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

#[async_trait]
impl CartRepository for PgCartStore {
    async fn find_or_create_session(&self, token: &str) -> Result<CartSession> {
        // A concurrent insert of the same token loses the conflict and re-reads the winner's row.
        sqlx::query("INSERT INTO cart_sessions (token, created_at) VALUES ($1, NOW()) ON CONFLICT (token) DO NOTHING")
            .bind(token).execute(&self.db).await?;
        let row = sqlx::query_as::<_, SessionRow>("SELECT id, token, created_at FROM cart_sessions WHERE token = $1")
            .bind(token).fetch_one(&self.db).await?;
        Ok(CartSession { id: row.id, token: row.token, created_at: row.created_at })
    }

    async fn lines(&self, session_id: i64) -> Result<Vec<CartLine>> {
        let rows = sqlx::query_as::<_, LineRow>("SELECT id, session_id, product_id, quantity, created_at FROM cart WHERE session_id = $1 AND quantity > 0 ORDER BY created_at DESC, id DESC")
            .bind(session_id).fetch_all(&self.db).await?;
        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    async fn add_line(&self, session_id: i64, product_id: i64, quantity: u32) -> Result<CartLine> {
        // the guarded update returns no row when the sum would pass the quantity ceiling
        let row = sqlx::query_as::<_, LineRow>("INSERT INTO cart (session_id, product_id, quantity, created_at) VALUES ($1, $2, $3, NOW()) ON CONFLICT (session_id, product_id) DO UPDATE SET quantity = cart.quantity + EXCLUDED.quantity WHERE cart.quantity::bigint + EXCLUDED.quantity <= $4 RETURNING id, session_id, product_id, quantity, created_at")
            .bind(session_id).bind(product_id).bind(db_quantity(quantity)?).bind(i64::from(Quantity::MAX))
            .fetch_optional(&self.db).await?;
        row.map(CartLine::from).ok_or_else(|| CartError::InvalidRequest(format!("quantity above {}", Quantity::MAX)))
    }

    async fn set_line_quantity(&self, session_id: i64, line_id: i64, quantity: u32) -> Result<Option<CartLine>> {
        let row = sqlx::query_as::<_, LineRow>("UPDATE cart SET quantity = $3 WHERE id = $1 AND session_id = $2 RETURNING id, session_id, product_id, quantity, created_at")
            .bind(line_id).bind(session_id).bind(db_quantity(quantity)?)
            .fetch_optional(&self.db).await?;
        Ok(row.map(CartLine::from))
    }

    async fn delete_line(&self, session_id: i64, line_id: i64) -> Result<bool> {
        let mut tx = self.db.begin().await?;
        let deleted = sqlx::query("DELETE FROM cart WHERE id = $1 AND session_id = $2")
            .bind(line_id).bind(session_id).execute(&mut *tx).await?.rows_affected();
        sqlx::query("DELETE FROM cart WHERE session_id = $1 AND quantity <= 0")
            .bind(session_id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn clear(&self, session_id: i64) -> Result<u64> {
        let res = sqlx::query("DELETE FROM cart WHERE session_id = $1").bind(session_id).execute(&self.db).await?;
        Ok(res.rows_affected())
    }
}
