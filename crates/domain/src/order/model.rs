//! The persisted order document.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::{
    LineItem, OrderError, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
};
use crate::money::Money;

/// A placed order.
///
/// Created once by checkout. Afterwards only `status`, `payment_status` and the
/// cancellation fields change; line items and totals are fixed forever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: PaymentMethod,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub tax: Money,
    pub grand_total: Money,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub cancelled: bool,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Checks whether the order may still be cancelled.
    ///
    /// Only orders that are pending and unpaid qualify; the rule applies to
    /// administrators too.
    pub fn ensure_cancellable(&self) -> Result<(), OrderError> {
        if self.cancelled {
            return Err(OrderError::AlreadyCancelled);
        }
        if self.status != OrderStatus::Pending || self.payment_status != PaymentStatus::Unpaid {
            return Err(OrderError::CancelNotAllowed {
                status: self.status,
                payment_status: self.payment_status,
            });
        }
        Ok(())
    }

    /// Sets the one-way cancellation flag.
    pub fn mark_cancelled(&mut self, at: DateTime<Utc>) {
        self.cancelled = true;
        self.cancelled_at = Some(at);
        self.updated_at = at;
    }

    /// Line items sorted by product id.
    ///
    /// Stock writes for an order go through this order so that concurrent
    /// units lock product rows in the same sequence.
    pub fn items_by_product(&self) -> Vec<&LineItem> {
        let mut items: Vec<&LineItem> = self.items.iter().collect();
        items.sort_by_key(|item| item.product_id);
        items
    }

    /// Applies an administrative status change without transition checks.
    pub fn apply_status_update(&mut self, update: &StatusUpdate, at: DateTime<Utc>) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(payment_status) = update.payment_status {
            self.payment_status = payment_status;
        }
        self.updated_at = at;
    }
}

/// An administrative status assignment. Either field may be omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl StatusUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.payment_status.is_none()
    }
}
