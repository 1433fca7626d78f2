//! Shopping cart document.

use chrono::{DateTime, Utc};
use common::{CartId, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// One line of a cart. Holds the product by key only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A user's cart. There is at most one cart per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for a user.
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: CartId::new(),
            user_id,
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds `quantity` of a product, merging with an existing line.
    pub fn add_item(&mut self, product_id: ProductId, quantity: u32) {
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.items.push(CartItem {
                product_id,
                quantity,
            }),
        }
        self.updated_at = Utc::now();
    }

    /// Removes a product line. Returns false if it was not in the cart.
    pub fn remove_item(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.updated_at = Utc::now();
        self.items.len() != before
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.updated_at = Utc::now();
    }

    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.items
            .iter()
            .find(|i| i.product_id == product_id)
            .map_or(0, |i| i.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = Cart::new(UserId::new());
        let p = ProductId::new();

        cart.add_item(p, 2);
        cart.add_item(p, 3);
        cart.add_item(ProductId::new(), 1);

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.quantity_of(p), 5);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new(UserId::new());
        let p = ProductId::new();
        cart.add_item(p, 1);

        assert!(!cart.remove_item(ProductId::new()));
        assert!(cart.remove_item(p));
        assert!(cart.is_empty());

        cart.add_item(p, 1);
        cart.clear();
        assert!(cart.is_empty());
    }
}
