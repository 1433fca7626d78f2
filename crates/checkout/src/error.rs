//! Checkout error types.

use common::{OrderId, ProductId};
use domain::OrderError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during checkout, cancellation and order access.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The user has no cart or the cart has no items.
    #[error("Cart is empty")]
    EmptyCart,

    /// A cart line references a missing or inactive product.
    #[error("Product {product_id} is unavailable")]
    ProductUnavailable { product_id: ProductId },

    /// A cart line asks for more units than are in stock.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Stock dropped between reading the cart and committing the order.
    #[error("Stock changed during checkout for product {product_id}")]
    StockConflict { product_id: ProductId },

    /// The checkout unit of work was aborted.
    #[error("Checkout failed: {0}")]
    CheckoutFailed(#[source] StoreError),

    /// The cancellation unit of work was aborted.
    #[error("Cancellation of order {order_id} failed: {source}")]
    CancelFailed {
        order_id: OrderId,
        #[source]
        source: StoreError,
    },

    /// The caller may not act on the resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Product not found.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The request is well-formed but cannot be applied.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An order rule rejected the operation.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// A read or single-document write failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CheckoutError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            CheckoutError::EmptyCart => "empty_cart",
            CheckoutError::ProductUnavailable { .. } => "product_unavailable",
            CheckoutError::InsufficientStock { .. } => "insufficient_stock",
            CheckoutError::StockConflict { .. } => "stock_conflict",
            CheckoutError::CheckoutFailed(_) => "checkout_failed",
            CheckoutError::CancelFailed { .. } => "cancel_failed",
            CheckoutError::Forbidden(_) => "forbidden",
            CheckoutError::OrderNotFound(_) => "order_not_found",
            CheckoutError::ProductNotFound(_) => "product_not_found",
            CheckoutError::InvalidRequest(_) => "invalid_request",
            CheckoutError::Order(OrderError::NoItems) => "no_items",
            CheckoutError::Order(OrderError::AmountOverflow) => "amount_overflow",
            CheckoutError::Order(OrderError::AlreadyCancelled) => "already_cancelled",
            CheckoutError::Order(OrderError::CancelNotAllowed { .. }) => "cancel_not_allowed",
            CheckoutError::Store(_) => "store",
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
