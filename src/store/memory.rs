use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use crate::domain::aggregates::{CartLine, CartSession};
use crate::domain::value_objects::Quantity;
use crate::error::{CartError, Result};
use crate::store::CartRepository;

#[derive(Debug, Default)]
struct Tables {
    sessions: HashMap<String, CartSession>,
    lines: HashMap<i64, CartLine>,
    next_session_id: i64,
    next_line_id: i64,
}

/// Cart store held in process memory. Ids are monotonic, matching serial keys.
#[derive(Debug, Default)]
pub struct MemoryCartStore {
    tables: RwLock<Tables>,
}

impl MemoryCartStore {
    pub fn new() -> Self { Self::default() }

    pub async fn session_count(&self) -> usize { self.tables.read().await.sessions.len() }
}

#[async_trait]
impl CartRepository for MemoryCartStore {
    async fn find_or_create_session(&self, token: &str) -> Result<CartSession> {
        let mut t = self.tables.write().await;
        if let Some(s) = t.sessions.get(token) { return Ok(s.clone()); }
        t.next_session_id += 1;
        let session = CartSession { id: t.next_session_id, token: token.to_string(), created_at: Utc::now() };
        t.sessions.insert(token.to_string(), session.clone());
        Ok(session)
    }

    async fn lines(&self, session_id: i64) -> Result<Vec<CartLine>> {
        let t = self.tables.read().await;
        let mut lines: Vec<CartLine> = t.lines.values().filter(|l| l.session_id == session_id).cloned().collect();
        lines.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(lines)
    }

    async fn add_line(&self, session_id: i64, product_id: i64, quantity: u32) -> Result<CartLine> {
        let mut t = self.tables.write().await;
        if let Some(line) = t.lines.values_mut().find(|l| l.session_id == session_id && l.product_id == product_id) {
            line.quantity = Quantity::new(line.quantity).checked_add(quantity)
                .ok_or_else(|| CartError::InvalidRequest(format!("quantity above {}", Quantity::MAX)))?
                .value();
            return Ok(line.clone());
        }
        t.next_line_id += 1;
        let line = CartLine { id: t.next_line_id, session_id, product_id, quantity, created_at: Utc::now() };
        t.lines.insert(line.id, line.clone());
        Ok(line)
    }

    async fn set_line_quantity(&self, session_id: i64, line_id: i64, quantity: u32) -> Result<Option<CartLine>> {
        let mut t = self.tables.write().await;
        Ok(t.lines.get_mut(&line_id).filter(|l| l.session_id == session_id).map(|l| {
            l.quantity = quantity;
            l.clone()
        }))
    }

    async fn delete_line(&self, session_id: i64, line_id: i64) -> Result<bool> {
        let mut t = self.tables.write().await;
        let existed = t.lines.get(&line_id).is_some_and(|l| l.session_id == session_id);
        t.lines.retain(|id, l| !(l.session_id == session_id && (*id == line_id || l.quantity == 0)));
        Ok(existed)
    }

    async fn clear(&self, session_id: i64) -> Result<u64> {
        let mut t = self.tables.write().await;
        let before = t.lines.len();
        t.lines.retain(|_, l| l.session_id != session_id);
        Ok((before - t.lines.len()) as u64)
    }
}
