//! Loads a user's cart and validates it against live product data.

use std::collections::HashMap;

use common::{CartId, ProductId, UserId};
use domain::{CartLine, Product};
use store::Store;

use crate::error::CheckoutError;

/// A cart whose lines were all available and in stock when it was read.
#[derive(Debug, Clone)]
pub struct CartSnapshot {
    pub cart_id: CartId,
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
}

/// Reads and validates carts. Performs no writes.
pub struct CartSnapshotReader<S: Store> {
    store: S,
}

impl<S: Store> CartSnapshotReader<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads the user's cart with the current state of every referenced product.
    ///
    /// Fails with `EmptyCart` if there is no cart or it has no items,
    /// `ProductUnavailable` if a product is missing or inactive, and
    /// `InsufficientStock` if a line asks for more than is on hand.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, user_id: UserId) -> Result<CartSnapshot, CheckoutError> {
        let cart = self
            .store
            .get_cart(user_id)
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or(CheckoutError::EmptyCart)?;

        let ids: Vec<ProductId> = cart.items.iter().map(|item| item.product_id).collect();
        let products: HashMap<ProductId, Product> = self
            .store
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|product| (product.id, product))
            .collect();

        let mut lines = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let product = products
                .get(&item.product_id)
                .filter(|product| product.active)
                .ok_or(CheckoutError::ProductUnavailable {
                    product_id: item.product_id,
                })?;

            if !product.has_stock_for(item.quantity) {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    requested: item.quantity,
                    available: product.stock,
                });
            }

            lines.push(CartLine {
                product: product.clone(),
                quantity: item.quantity,
            });
        }

        Ok(CartSnapshot {
            cart_id: cart.id,
            user_id,
            lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Cart, Money};
    use store::InMemoryStore;

    async fn setup(products: &[Product], quantities: &[u32]) -> (InMemoryStore, UserId) {
        let store = InMemoryStore::new();
        let user_id = UserId::new();
        let mut cart = Cart::new(user_id);
        for (product, quantity) in products.iter().zip(quantities) {
            store.insert_product(product).await.unwrap();
            cart.add_item(product.id, *quantity);
        }
        store.save_cart(&cart).await.unwrap();
        (store, user_id)
    }

    #[tokio::test]
    async fn test_loads_valid_cart() {
        let a = Product::new("A", "a", Money::from_cents(1000), 5);
        let b = Product::new("B", "b", Money::from_cents(250), 1);
        let (store, user_id) = setup(&[a.clone(), b.clone()], &[2, 1]).await;

        let snapshot = CartSnapshotReader::new(store).load(user_id).await.unwrap();

        assert_eq!(snapshot.user_id, user_id);
        assert_eq!(snapshot.lines.len(), 2);
        assert_eq!(snapshot.lines[0].product.id, a.id);
        assert_eq!(snapshot.lines[0].quantity, 2);
        assert_eq!(snapshot.lines[1].product.id, b.id);
    }

    #[tokio::test]
    async fn test_missing_cart_is_empty() {
        let reader = CartSnapshotReader::new(InMemoryStore::new());
        let result = reader.load(UserId::new()).await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_cart_without_items_is_empty() {
        let store = InMemoryStore::new();
        let user_id = UserId::new();
        store.save_cart(&Cart::new(user_id)).await.unwrap();

        let result = CartSnapshotReader::new(store).load(user_id).await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_inactive_product_unavailable() {
        let p = Product::new("Old", "old", Money::from_cents(100), 10).deactivated();
        let (store, user_id) = setup(std::slice::from_ref(&p), &[1]).await;

        let result = CartSnapshotReader::new(store).load(user_id).await;
        assert!(matches!(
            result,
            Err(CheckoutError::ProductUnavailable { product_id }) if product_id == p.id
        ));
    }

    #[tokio::test]
    async fn test_missing_product_unavailable() {
        let store = InMemoryStore::new();
        let user_id = UserId::new();
        let mut cart = Cart::new(user_id);
        cart.add_item(ProductId::new(), 1);
        store.save_cart(&cart).await.unwrap();

        let result = CartSnapshotReader::new(store).load(user_id).await;
        assert!(matches!(result, Err(CheckoutError::ProductUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_insufficient_stock() {
        let p = Product::new("B", "b", Money::from_cents(100), 1);
        let (store, user_id) = setup(std::slice::from_ref(&p), &[2]).await;

        let result = CartSnapshotReader::new(store).load(user_id).await;
        assert!(matches!(
            result,
            Err(CheckoutError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            })
        ));
    }
}
