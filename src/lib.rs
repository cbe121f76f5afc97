//! Stationery Cart
//!
//! Cart core of a wholesale stationery storefront.
//!
//! ## Features
//! - Cart sessions keyed by anonymous token or deterministic customer token
//! - Cart store with additive adds, absolute quantity sets and delete-on-zero
//! - HTTP/JSON cart API with a typed failure envelope
//! - Client cart cache with optimistic, debounced quantity writes
//! - Postgres or in-memory persistence, optional NATS cart events

pub mod api;
pub mod catalog;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod service;
pub mod session;
pub mod store;

pub use error::{ApiFailure, CartError, ErrorCode, Result};
pub use service::{CartListing, CartService};
pub use session::{SessionContext, SessionResolver};
