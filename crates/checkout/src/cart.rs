//! Cart maintenance ahead of checkout.

use common::{ProductId, UserId};
use domain::Cart;
use store::Store;

use crate::error::CheckoutError;

/// Reads and edits a user's single cart.
pub struct CartService<S: Store> {
    store: S,
}

impl<S: Store> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's cart, or an unsaved empty one.
    pub async fn get_cart(&self, user_id: UserId) -> Result<Cart, CheckoutError> {
        Ok(self
            .store
            .get_cart(user_id)
            .await?
            .unwrap_or_else(|| Cart::new(user_id)))
    }

    /// Adds `quantity` units of a product, merging with an existing line.
    ///
    /// The merged quantity must be available at the time of the call. Stock
    /// is not reserved; checkout validates it again.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart, CheckoutError> {
        if quantity == 0 {
            return Err(CheckoutError::InvalidRequest(
                "quantity must be at least 1".to_string(),
            ));
        }

        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or(CheckoutError::ProductNotFound(product_id))?;
        if !product.active {
            return Err(CheckoutError::ProductUnavailable { product_id });
        }

        let mut cart = self.get_cart(user_id).await?;
        let requested = cart.quantity_of(product_id).saturating_add(quantity);
        if !product.has_stock_for(requested) {
            return Err(CheckoutError::InsufficientStock {
                product_id,
                requested,
                available: product.stock,
            });
        }

        cart.add_item(product_id, quantity);
        Ok(self.store.save_cart(&cart).await?)
    }

    /// Removes a product's line. Removing an absent line is not an error.
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, CheckoutError> {
        let mut cart = self.get_cart(user_id).await?;
        if cart.remove_item(product_id) {
            return Ok(self.store.save_cart(&cart).await?);
        }
        Ok(cart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, Product};
    use store::InMemoryStore;

    async fn service_with(product: &Product) -> CartService<InMemoryStore> {
        let store = InMemoryStore::new();
        store.insert_product(product).await.unwrap();
        CartService::new(store)
    }

    #[tokio::test]
    async fn test_add_merges_lines() {
        let product = Product::new("Mug", "mug", Money::from_cents(800), 5);
        let service = service_with(&product).await;
        let user_id = UserId::new();

        service.add_item(user_id, product.id, 2).await.unwrap();
        let cart = service.add_item(user_id, product.id, 1).await.unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.quantity_of(product.id), 3);
        assert_eq!(service.get_cart(user_id).await.unwrap().id, cart.id);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input() {
        let product = Product::new("Mug", "mug", Money::from_cents(800), 2);
        let service = service_with(&product).await;
        let user_id = UserId::new();

        assert!(matches!(
            service.add_item(user_id, product.id, 0).await,
            Err(CheckoutError::InvalidRequest(_))
        ));
        assert!(matches!(
            service.add_item(user_id, ProductId::new(), 1).await,
            Err(CheckoutError::ProductNotFound(_))
        ));

        service.add_item(user_id, product.id, 2).await.unwrap();
        assert!(matches!(
            service.add_item(user_id, product.id, 1).await,
            Err(CheckoutError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_add_rejects_inactive_product() {
        let product = Product::new("Old", "old", Money::from_cents(100), 5).deactivated();
        let service = service_with(&product).await;

        assert!(matches!(
            service.add_item(UserId::new(), product.id, 1).await,
            Err(CheckoutError::ProductUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_remove_item() {
        let product = Product::new("Mug", "mug", Money::from_cents(800), 5);
        let service = service_with(&product).await;
        let user_id = UserId::new();
        service.add_item(user_id, product.id, 2).await.unwrap();

        let cart = service.remove_item(user_id, product.id).await.unwrap();
        assert!(cart.is_empty());

        let again = service.remove_item(user_id, product.id).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_missing_cart_is_empty() {
        let service = CartService::new(InMemoryStore::new());
        assert!(service.get_cart(UserId::new()).await.unwrap().is_empty());
    }
}
