//! Domain layer for the commerce backend.
//!
//! This crate holds the documents the store persists and the pure rules
//! that operate on them:
//! - `Product`, `Cart` and `Order` documents
//! - `Money`, a two-decimal monetary amount
//! - pricing policies and the `OrderBuilder` that snapshots a cart into an order draft
//! - order cancellation eligibility

pub mod cart;
pub mod error;
pub mod identity;
pub mod money;
pub mod order;
pub mod pricing;
pub mod product;

pub use cart::{Cart, CartItem};
pub use common::{CartId, OrderId, ProductId, UserId};
pub use error::DomainError;
pub use identity::{Identity, Role};
pub use money::Money;
pub use order::{
    CartLine, LineItem, Order, OrderBuilder, OrderDraft, OrderError, OrderStatus, PaymentMethod,
    PaymentStatus, ShippingAddress, StatusUpdate,
};
pub use pricing::{FlatRateShipping, FreeShipping, NoTax, ShippingPolicy, TaxPolicy};
pub use product::Product;
