//! HTTP surface of the cart
//!
//! Every response is an envelope with an `ok` flag. Failures carry a
//! machine-checkable `error.code`; rejections from the extractors are folded
//! into the same envelope as `invalid_request`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, warn};
use validator::Validate;
use crate::domain::aggregates::CartItem;
use crate::error::{ApiFailure, CartError, ErrorCode};
use crate::service::CartService;
use crate::session::SessionContext;

#[derive(Clone)]
pub struct AppState { pub cart: CartService }

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "stationery-cart"})) }))
        .route("/api/v1/cart", get(list_cart).delete(clear_cart))
        .route("/api/v1/cart/items", post(add_to_cart))
        .route("/api/v1/cart/items/:line_id", put(set_quantity).delete(remove_line))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

// --- request schema ---

#[derive(Debug, Default, Deserialize, Validate)]
pub struct SessionParams {
    pub customer_id: Option<i64>,
    #[validate(length(max = 128))]
    pub session_token: Option<String>,
}

impl SessionParams {
    fn context(&self) -> SessionContext {
        SessionContext { customer_id: self.customer_id, session_token: self.session_token.clone() }
    }
}

fn default_quantity() -> u32 { 1 }

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AddItemRequest {
    pub customer_id: Option<i64>,
    #[validate(length(max = 128))]
    pub session_token: Option<String>,
    pub product_id: i64,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 9999))]
    pub quantity: u32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SetQuantityRequest {
    pub customer_id: Option<i64>,
    #[validate(length(max = 128))]
    pub session_token: Option<String>,
    #[validate(range(max = 9999))]
    pub quantity: u32,
}

// --- response schema ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub ok: bool,
    pub session_token: Option<String>,
    pub items: Vec<CartItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddResponse {
    pub ok: bool,
    pub session_token: String,
    pub line_id: i64,
    pub quantity: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse { pub ok: bool }

impl OkResponse { fn ok() -> Json<Self> { Json(Self { ok: true }) } }

#[derive(Debug, Serialize, Deserialize)]
pub struct FailureResponse {
    pub ok: bool,
    pub error: ApiFailure,
}

/// A failed request, rendered as the failure envelope.
#[derive(Debug)]
pub struct ApiError(CartError);

impl From<CartError> for ApiError {
    fn from(e: CartError) -> Self { Self(e) }
}

fn invalid(reason: impl ToString) -> ApiError { ApiError(CartError::InvalidRequest(reason.to_string())) }

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.code() {
            ErrorCode::SessionRequired | ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCode::ProductNotFound | ErrorCode::LineNotFound => StatusCode::NOT_FOUND,
            ErrorCode::ProductInactive => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::TransientIo => StatusCode::SERVICE_UNAVAILABLE,
        };
        if self.0.is_transient() { error!(error = %self.0, "cart storage failure"); } else { warn!(code = %self.0.code(), "cart request rejected: {}", self.0); }
        (status, Json(FailureResponse { ok: false, error: ApiFailure::from(&self.0) })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// --- handlers ---

async fn list_cart(State(s): State<AppState>, q: Result<Query<SessionParams>, QueryRejection>) -> ApiResult<ListResponse> {
    let Query(params) = q.map_err(invalid)?;
    params.validate().map_err(invalid)?;
    let listing = s.cart.list(&params.context()).await?;
    Ok(Json(ListResponse { ok: true, session_token: listing.session_token, items: listing.items }))
}

async fn add_to_cart(State(s): State<AppState>, body: Result<Json<AddItemRequest>, JsonRejection>) -> ApiResult<AddResponse> {
    let Json(r) = body.map_err(invalid)?;
    r.validate().map_err(invalid)?;
    let ctx = SessionContext { customer_id: r.customer_id, session_token: r.session_token };
    let (session, line) = s.cart.add(&ctx, r.product_id, r.quantity).await?;
    Ok(Json(AddResponse { ok: true, session_token: session.token, line_id: line.id, quantity: line.quantity }))
}

async fn set_quantity(
    State(s): State<AppState>,
    line_id: Result<Path<i64>, PathRejection>,
    body: Result<Json<SetQuantityRequest>, JsonRejection>,
) -> ApiResult<OkResponse> {
    let Path(line_id) = line_id.map_err(invalid)?;
    let Json(r) = body.map_err(invalid)?;
    r.validate().map_err(invalid)?;
    let ctx = SessionContext { customer_id: r.customer_id, session_token: r.session_token };
    s.cart.set_quantity(&ctx, line_id, r.quantity).await?;
    Ok(OkResponse::ok())
}

async fn remove_line(
    State(s): State<AppState>,
    line_id: Result<Path<i64>, PathRejection>,
    q: Result<Query<SessionParams>, QueryRejection>,
) -> ApiResult<OkResponse> {
    let Path(line_id) = line_id.map_err(invalid)?;
    let Query(params) = q.map_err(invalid)?;
    params.validate().map_err(invalid)?;
    s.cart.remove(&params.context(), line_id).await?;
    Ok(OkResponse::ok())
}

async fn clear_cart(State(s): State<AppState>, q: Result<Query<SessionParams>, QueryRejection>) -> ApiResult<OkResponse> {
    let Query(params) = q.map_err(invalid)?;
    params.validate().map_err(invalid)?;
    s.cart.clear(&params.context()).await?;
    Ok(OkResponse::ok())
}
