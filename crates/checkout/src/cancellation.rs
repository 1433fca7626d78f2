//! Cancels pending orders and restores their stock.

use chrono::Utc;
use common::OrderId;
use domain::{Identity, Order};
use store::{Store, StoreError, UnitOfWork};

use crate::error::CheckoutError;

/// Reverses a checkout in a single unit of work.
pub struct CancellationCoordinator<S: Store> {
    store: S,
}

impl<S: Store> CancellationCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Cancels an order on behalf of its owner or an administrator.
    ///
    /// Only pending, unpaid orders qualify. Stock for every line is returned
    /// and the order is flagged cancelled atomically; the flag write only
    /// matches an order that is still cancellable, so concurrent cancellations
    /// restore stock at most once.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn cancel(
        &self,
        order_id: OrderId,
        identity: &Identity,
    ) -> Result<Order, CheckoutError> {
        let result = self.run(order_id, identity).await;
        match &result {
            Ok(_) => {
                metrics::counter!("order_cancellations_total").increment(1);
                tracing::info!("order cancelled");
            }
            Err(e) => {
                metrics::counter!("order_cancellations_failed_total", "reason" => e.reason())
                    .increment(1);
                tracing::warn!(error = %e, "cancellation failed");
            }
        }
        result
    }

    async fn run(&self, order_id: OrderId, identity: &Identity) -> Result<Order, CheckoutError> {
        let mut order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        if !identity.can_access(order.user_id) {
            return Err(CheckoutError::Forbidden(format!(
                "order {order_id} belongs to another user"
            )));
        }

        order.ensure_cancellable()?;

        let at = Utc::now();
        let failed = |source| CheckoutError::CancelFailed { order_id, source };
        let mut unit = self.store.begin().await.map_err(failed)?;

        match apply_cancellation(unit.as_mut(), &order, at).await {
            Ok(()) => unit.commit().await.map_err(failed)?,
            Err(source) => {
                if let Err(rollback_err) = unit.rollback().await {
                    tracing::warn!(error = %rollback_err, "cancellation rollback failed");
                }
                return Err(failed(source));
            }
        }

        order.mark_cancelled(at);
        Ok(order)
    }
}

async fn apply_cancellation(
    unit: &mut dyn UnitOfWork,
    order: &Order,
    at: chrono::DateTime<Utc>,
) -> Result<(), StoreError> {
    for item in order.items_by_product() {
        if !unit.increment_stock(item.product_id, item.quantity).await? {
            tracing::warn!(
                product_id = %item.product_id,
                quantity = item.quantity,
                "product missing, stock not restored"
            );
        }
    }

    if !unit.mark_order_cancelled(order.id, at).await? {
        return Err(StoreError::Conflict(format!(
            "order {} is no longer cancellable",
            order.id
        )));
    }

    Ok(())
}
