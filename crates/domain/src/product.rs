//! Catalog product document.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A sellable product.
///
/// `stock` is only ever changed through the store's conditional decrement and
/// unconditional increment; checkout and cancellation never assign it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub price: Money,
    pub stock: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a new active product.
    pub fn new(
        title: impl Into<String>,
        slug: impl Into<String>,
        price: Money,
        stock: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ProductId::new(),
            title: title.into(),
            slug: slug.into(),
            price,
            stock,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy marked inactive.
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// Returns true if `quantity` units can currently be sold.
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}
