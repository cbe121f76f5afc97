//! Session resolution
//!
//! Every cart operation first turns the caller's identity into a durable
//! [`CartSession`]. An explicit token wins; a customer id alone maps to the
//! deterministic `customer_<id>` token so the same customer lands on the same
//! cart from any device. With neither there is no session.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use crate::domain::aggregates::CartSession;
use crate::domain::value_objects::SessionToken;
use crate::error::{CartError, Result};
use crate::store::CartRepository;

/// Caller identity for one cart request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub customer_id: Option<i64>,
    pub session_token: Option<String>,
}

impl SessionContext {
    pub fn customer(customer_id: i64) -> Self { Self { customer_id: Some(customer_id), session_token: None } }

    pub fn token(token: impl Into<String>) -> Self { Self { customer_id: None, session_token: Some(token.into()) } }

    pub fn anonymous() -> Self { Self::default() }

    /// The token this context resolves to, if any.
    pub fn effective_token(&self) -> Result<Option<SessionToken>> {
        if let Some(raw) = self.session_token.as_deref() {
            if let Some(token) = SessionToken::parse(raw).map_err(|e| CartError::InvalidRequest(e.to_string()))? {
                return Ok(Some(token));
            }
        }
        Ok(self.customer_id.map(SessionToken::for_customer))
    }
}

#[derive(Clone)]
pub struct SessionResolver {
    repo: Arc<dyn CartRepository>,
}

impl SessionResolver {
    pub fn new(repo: Arc<dyn CartRepository>) -> Self { Self { repo } }

    /// Finds or creates the session for `ctx`; `None` when the context carries no identity.
    pub async fn resolve(&self, ctx: &SessionContext) -> Result<Option<CartSession>> {
        let Some(token) = ctx.effective_token()? else { return Ok(None) };
        let session = self.repo.find_or_create_session(token.as_str()).await?;
        debug!(session_id = session.id, customer = token.is_customer(), "resolved cart session");
        Ok(Some(session))
    }

    /// Like [`resolve`](Self::resolve) but a missing identity is `SessionRequired`.
    pub async fn require(&self, ctx: &SessionContext) -> Result<CartSession> {
        self.resolve(ctx).await?.ok_or(CartError::SessionRequired)
    }
}
