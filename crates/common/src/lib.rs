//! Shared identifier types for the commerce backend.

pub mod types;

pub use types::{CartId, OrderId, ProductId, UserId};
