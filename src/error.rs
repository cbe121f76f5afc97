//! Cart error taxonomy

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Machine-checkable failure reason carried in every failed API response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    SessionRequired,
    ProductNotFound,
    ProductInactive,
    LineNotFound,
    InvalidRequest,
    TransientIo,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionRequired => "session_required",
            Self::ProductNotFound => "product_not_found",
            Self::ProductInactive => "product_inactive",
            Self::LineNotFound => "line_not_found",
            Self::InvalidRequest => "invalid_request",
            Self::TransientIo => "transient_io",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Error, Debug)]
pub enum CartError {
    #[error("A customer id or session token is required")]
    SessionRequired,

    #[error("Product {0} not found")]
    ProductNotFound(i64),

    #[error("Product {0} is not available for purchase")]
    ProductInactive(i64),

    #[error("Cart line {0} not found")]
    LineNotFound(i64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Storage error: {0}")]
    Transient(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CartError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::SessionRequired => ErrorCode::SessionRequired,
            Self::ProductNotFound(_) => ErrorCode::ProductNotFound,
            Self::ProductInactive(_) => ErrorCode::ProductInactive,
            Self::LineNotFound(_) => ErrorCode::LineNotFound,
            Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
            Self::Transient(_) | Self::Storage(_) => ErrorCode::TransientIo,
        }
    }

    pub fn is_transient(&self) -> bool { self.code() == ErrorCode::TransientIo }
}

pub type Result<T> = std::result::Result<T, CartError>;

/// A failed cart call as seen by a client: the decoded error envelope, or a
/// transport failure reported as `transient_io`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ApiFailure {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiFailure {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self { Self { code, message: message.into() } }
}

impl From<&CartError> for ApiFailure {
    fn from(err: &CartError) -> Self {
        // storage details stay in the server log
        let message = if err.is_transient() { "Storage temporarily unavailable".to_string() } else { err.to_string() };
        Self { code: err.code(), message }
    }
}

impl From<CartError> for ApiFailure {
    fn from(err: CartError) -> Self { Self::from(&err) }
}

impl From<reqwest::Error> for ApiFailure {
    fn from(err: reqwest::Error) -> Self { Self::new(ErrorCode::TransientIo, err.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(CartError::SessionRequired.code(), ErrorCode::SessionRequired);
        assert_eq!(CartError::LineNotFound(3).code().as_str(), "line_not_found");
        assert!(CartError::Transient(sqlx::Error::PoolTimedOut).is_transient());
        assert_eq!(serde_json::to_string(&ErrorCode::TransientIo).unwrap(), "\"transient_io\"");
    }

    #[test]
    fn test_failure_hides_storage_detail() {
        let failure = ApiFailure::from(CartError::Storage("connection reset by peer".into()));
        assert_eq!(failure.code, ErrorCode::TransientIo);
        assert!(!failure.message.contains("peer"));
        let failure = ApiFailure::from(CartError::ProductInactive(8));
        assert_eq!(failure.message, "Product 8 is not available for purchase");
    }
}
