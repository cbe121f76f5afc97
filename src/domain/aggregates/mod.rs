//! Aggregates module
pub mod product;
pub mod cart;

pub use product::{Product, ProductStatus, ProductStatusError};
pub use cart::{CartItem, CartLine, CartSession};
