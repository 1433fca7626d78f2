//! Order reads and administrative status changes.

use common::{OrderId, UserId};
use domain::{Identity, Order, StatusUpdate};
use store::Store;

use crate::error::CheckoutError;

/// Access-checked order queries.
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads an order visible to the caller.
    ///
    /// Existence is checked before ownership, so a missing order is
    /// `OrderNotFound` for everyone.
    pub async fn get_order(
        &self,
        order_id: OrderId,
        identity: &Identity,
    ) -> Result<Order, CheckoutError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        if !identity.can_access(order.user_id) {
            return Err(CheckoutError::Forbidden(format!(
                "order {order_id} belongs to another user"
            )));
        }
        Ok(order)
    }

    /// Lists a user's orders, newest first.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, CheckoutError> {
        Ok(self.store.list_orders_for_user(user_id).await?)
    }

    /// Lists every order. Administrators only.
    pub async fn list_all(&self, identity: &Identity) -> Result<Vec<Order>, CheckoutError> {
        require_admin(identity)?;
        Ok(self.store.list_orders().await?)
    }

    /// Assigns order and payment status. Administrators only.
    ///
    /// No transition rules are enforced, but at least one field must be set.
    #[tracing::instrument(skip(self, identity))]
    pub async fn update_status(
        &self,
        identity: &Identity,
        order_id: OrderId,
        update: StatusUpdate,
    ) -> Result<Order, CheckoutError> {
        require_admin(identity)?;
        if update.is_empty() {
            return Err(CheckoutError::InvalidRequest(
                "status or payment_status is required".to_string(),
            ));
        }

        let order = self
            .store
            .update_order_status(order_id, update)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;
        tracing::info!(status = %order.status, payment_status = %order.payment_status, "order status updated");
        Ok(order)
    }
}

fn require_admin(identity: &Identity) -> Result<(), CheckoutError> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(CheckoutError::Forbidden(
            "administrator role required".to_string(),
        ))
    }
}
