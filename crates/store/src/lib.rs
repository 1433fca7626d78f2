//! Document store for products, carts and orders.
//!
//! Reads go through [`Store`]; every multi-document write that must be
//! all-or-nothing goes through a [`UnitOfWork`] obtained from [`Store::begin`].
//! Stock is only ever changed inside a unit of work, by a conditional
//! decrement or an unconditional increment.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{Store, UnitOfWork};
