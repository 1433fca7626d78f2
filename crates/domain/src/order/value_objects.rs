//! Value objects embedded in an order.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A priced line captured when the order was placed.
///
/// Title, slug and unit price are copies; later catalog edits never reach them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub title: String,
    pub slug: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

/// Where an order ships to. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl ShippingAddress {
    /// Returns true if no field is set.
    pub fn is_blank(&self) -> bool {
        [
            &self.full_name,
            &self.phone,
            &self.line1,
            &self.line2,
            &self.city,
            &self.state,
            &self.postal_code,
            &self.country,
        ]
        .iter()
        .all(|f| f.as_deref().is_none_or(|v| v.trim().is_empty()))
    }
}
