//! Places orders from carts.

use chrono::Utc;
use common::{CartId, UserId};
use domain::{Order, OrderBuilder, OrderDraft, PaymentMethod, ShippingAddress};
use store::{Store, StoreError, UnitOfWork};

use crate::error::CheckoutError;
use crate::reader::CartSnapshotReader;

/// Buyer-supplied checkout details.
#[derive(Debug, Clone, Default)]
pub struct CheckoutRequest {
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: PaymentMethod,
}

/// Orchestrates checkout: snapshot, price, then one atomic commit.
///
/// The commit decrements stock for every line with a conditional write,
/// inserts the order and empties the cart. Either all of it becomes visible
/// or none of it does.
pub struct CheckoutCoordinator<S: Store> {
    store: S,
    reader: CartSnapshotReader<S>,
    builder: OrderBuilder,
}

impl<S: Store + Clone> CheckoutCoordinator<S> {
    /// Creates a coordinator with free shipping and no tax.
    pub fn new(store: S) -> Self {
        Self::with_builder(store, OrderBuilder::default())
    }

    /// Creates a coordinator that prices orders with the given builder.
    pub fn with_builder(store: S, builder: OrderBuilder) -> Self {
        Self {
            reader: CartSnapshotReader::new(store.clone()),
            store,
            builder,
        }
    }
}

impl<S: Store> CheckoutCoordinator<S> {
    pub fn reader(&self) -> &CartSnapshotReader<S> {
        &self.reader
    }

    pub fn builder(&self) -> &OrderBuilder {
        &self.builder
    }

    /// Converts the user's cart into a pending, unpaid order.
    #[tracing::instrument(skip(self, request))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        request: CheckoutRequest,
    ) -> Result<Order, CheckoutError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let start = std::time::Instant::now();

        let result = self.run(user_id, request).await;

        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        match &result {
            Ok(order) => {
                metrics::counter!("checkout_completed_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    grand_total = %order.grand_total,
                    "order placed"
                );
            }
            Err(e) => {
                metrics::counter!("checkout_failed_total", "reason" => e.reason()).increment(1);
                tracing::warn!(error = %e, "checkout failed");
            }
        }
        result
    }

    async fn run(&self, user_id: UserId, request: CheckoutRequest) -> Result<Order, CheckoutError> {
        let snapshot = self.reader.load(user_id).await?;

        let shipping_address = request
            .shipping_address
            .filter(|address| !address.is_blank());
        let draft = self.builder.build(
            user_id,
            &snapshot.lines,
            shipping_address,
            request.payment_method,
        )?;

        self.commit(snapshot.cart_id, draft).await
    }

    /// Persists a priced draft in a single unit of work.
    ///
    /// Fails with `StockConflict` when a conditional decrement matches nothing,
    /// which means stock fell below the requested quantity after the cart was
    /// read. Every other failure inside the unit is reported as `CheckoutFailed`.
    #[tracing::instrument(skip(self, draft), fields(lines = draft.items.len()))]
    pub async fn commit(&self, cart_id: CartId, draft: OrderDraft) -> Result<Order, CheckoutError> {
        let order = draft.into_order(Utc::now());
        let mut unit = self.store.begin().await.map_err(CheckoutError::CheckoutFailed)?;

        match apply_checkout(unit.as_mut(), cart_id, &order).await {
            Ok(()) => {
                unit.commit().await.map_err(CheckoutError::CheckoutFailed)?;
                Ok(order)
            }
            Err(e) => {
                if let Err(rollback_err) = unit.rollback().await {
                    tracing::warn!(error = %rollback_err, "checkout rollback failed");
                }
                Err(e)
            }
        }
    }
}

async fn apply_checkout(
    unit: &mut dyn UnitOfWork,
    cart_id: CartId,
    order: &Order,
) -> Result<(), CheckoutError> {
    for item in order.items_by_product() {
        let decremented = unit
            .decrement_stock(item.product_id, item.quantity)
            .await
            .map_err(CheckoutError::CheckoutFailed)?;
        if !decremented {
            return Err(CheckoutError::StockConflict {
                product_id: item.product_id,
            });
        }
    }

    unit.insert_order(order)
        .await
        .map_err(CheckoutError::CheckoutFailed)?;

    let cleared = unit
        .clear_cart(cart_id)
        .await
        .map_err(CheckoutError::CheckoutFailed)?;
    if !cleared {
        return Err(CheckoutError::CheckoutFailed(StoreError::Conflict(format!(
            "cart {cart_id} was already checked out"
        ))));
    }

    Ok(())
}
