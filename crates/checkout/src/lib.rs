//! Order checkout and cancellation workflows.
//!
//! Checkout runs in three stages:
//! 1. [`CartSnapshotReader`] loads the cart and validates it against live products
//! 2. [`domain::OrderBuilder`] prices the lines into an order draft
//! 3. [`CheckoutCoordinator`] commits, in one unit of work, a conditional stock
//!    decrement per line, the order itself and the emptied cart
//!
//! [`CancellationCoordinator`] is the reverse unit: it restores stock for every
//! line of a pending, unpaid order and flags the order cancelled.
//!
//! If any step inside a unit fails, the unit is rolled back and no partial
//! effect is visible.

pub mod cancellation;
pub mod cart;
pub mod coordinator;
pub mod error;
pub mod orders;
pub mod reader;

pub use cancellation::CancellationCoordinator;
pub use cart::CartService;
pub use coordinator::{CheckoutCoordinator, CheckoutRequest};
pub use error::{CheckoutError, Result};
pub use orders::OrderService;
pub use reader::{CartSnapshot, CartSnapshotReader};
