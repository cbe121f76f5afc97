use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use crate::api::{AddItemRequest, AddResponse, FailureResponse, ListResponse, OkResponse, SetQuantityRequest};
use crate::client::{AddedLine, CartApi};
use crate::error::{ApiFailure, ErrorCode};
use crate::service::CartListing;
use crate::session::SessionContext;

#[derive(Serialize)]
struct SessionQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_token: Option<&'a str>,
}

impl<'a> From<&'a SessionContext> for SessionQuery<'a> {
    fn from(ctx: &'a SessionContext) -> Self {
        Self { customer_id: ctx.customer_id, session_token: ctx.session_token.as_deref() }
    }
}

/// Talks to the cart HTTP surface.
#[derive(Clone, Debug)]
pub struct HttpCartApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCartApi {
    pub fn new(base_url: impl Into<String>) -> Self { Self::with_client(reqwest::Client::new(), base_url) }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }

    /// Decodes the envelope whatever the status code; `ok: false` becomes the carried failure.
    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiFailure> {
        let status = resp.status();
        let body: serde_json::Value = resp.json().await?;
        let malformed = |e: serde_json::Error| ApiFailure::new(ErrorCode::TransientIo, format!("malformed response ({status}): {e}"));
        if body.get("ok").and_then(serde_json::Value::as_bool) == Some(true) {
            serde_json::from_value(body).map_err(malformed)
        } else {
            Err(serde_json::from_value::<FailureResponse>(body).map_err(malformed)?.error)
        }
    }
}

#[async_trait]
impl CartApi for HttpCartApi {
    async fn list_cart(&self, ctx: &SessionContext) -> Result<CartListing, ApiFailure> {
        let resp = self.http.get(self.url("/api/v1/cart")).query(&SessionQuery::from(ctx)).send().await?;
        let list: ListResponse = Self::decode(resp).await?;
        Ok(CartListing { session_token: list.session_token, items: list.items })
    }

    async fn add_to_cart(&self, ctx: &SessionContext, product_id: i64, quantity: u32) -> Result<AddedLine, ApiFailure> {
        let body = AddItemRequest { customer_id: ctx.customer_id, session_token: ctx.session_token.clone(), product_id, quantity };
        let resp = self.http.post(self.url("/api/v1/cart/items")).json(&body).send().await?;
        let added: AddResponse = Self::decode(resp).await?;
        Ok(AddedLine { session_token: added.session_token, line_id: added.line_id, quantity: added.quantity })
    }

    async fn set_quantity(&self, ctx: &SessionContext, line_id: i64, quantity: u32) -> Result<(), ApiFailure> {
        let body = SetQuantityRequest { customer_id: ctx.customer_id, session_token: ctx.session_token.clone(), quantity };
        let resp = self.http.put(self.url(&format!("/api/v1/cart/items/{line_id}"))).json(&body).send().await?;
        Self::decode::<OkResponse>(resp).await.map(|_| ())
    }

    async fn clear_cart(&self, ctx: &SessionContext) -> Result<(), ApiFailure> {
        let resp = self.http.delete(self.url("/api/v1/cart")).query(&SessionQuery::from(ctx)).send().await?;
        Self::decode::<OkResponse>(resp).await.map(|_| ())
    }
}
