//! Order document, its statuses and the builder that creates it.

mod builder;
mod model;
mod state;
mod value_objects;

pub use builder::{CartLine, OrderBuilder, OrderDraft};
pub use model::{Order, StatusUpdate};
pub use state::{OrderStatus, PaymentMethod, PaymentStatus};
pub use value_objects::{LineItem, ShippingAddress};

use thiserror::Error;

/// Errors raised by order rules.
#[derive(Debug, Error)]
pub enum OrderError {
    /// An order needs at least one line item.
    #[error("Order has no items")]
    NoItems,

    /// A price times quantity or a total does not fit in a decimal.
    #[error("Order amount is too large")]
    AmountOverflow,

    /// The order was cancelled before.
    #[error("Order is already cancelled")]
    AlreadyCancelled,

    /// The cancellation window has closed.
    #[error(
        "Order cannot be cancelled once payment or processing has begun (status {status}, payment {payment_status})"
    )]
    CancelNotAllowed {
        status: OrderStatus,
        payment_status: PaymentStatus,
    },
}
