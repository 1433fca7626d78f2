//! Turns validated cart lines into a priced order draft.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};

use super::{
    LineItem, Order, OrderError, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
};
use crate::money::Money;
use crate::pricing::{FreeShipping, NoTax, ShippingPolicy, TaxPolicy};
use crate::product::Product;

/// A cart line resolved against the live product.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

/// A priced order that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: PaymentMethod,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub tax: Money,
    pub grand_total: Money,
}

impl OrderDraft {
    /// Materialises the draft as a pending, unpaid order.
    pub fn into_order(self, now: DateTime<Utc>) -> Order {
        Order {
            id: OrderId::new(),
            user_id: self.user_id,
            items: self.items,
            shipping_address: self.shipping_address,
            payment_method: self.payment_method,
            subtotal: self.subtotal,
            shipping_fee: self.shipping_fee,
            tax: self.tax,
            grand_total: self.grand_total,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            cancelled: false,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Prices cart lines with the product's current price and the configured
/// shipping and tax policies.
///
/// Rounding happens at every accumulation step: each line total is rounded,
/// the sum of rounded lines is rounded again, and the grand total is rounded
/// once more after fees.
pub struct OrderBuilder {
    shipping: Box<dyn ShippingPolicy>,
    tax: Box<dyn TaxPolicy>,
}

impl Default for OrderBuilder {
    fn default() -> Self {
        Self::new(FreeShipping, NoTax)
    }
}

impl OrderBuilder {
    pub fn new(shipping: impl ShippingPolicy + 'static, tax: impl TaxPolicy + 'static) -> Self {
        Self {
            shipping: Box::new(shipping),
            tax: Box::new(tax),
        }
    }

    pub fn build(
        &self,
        user_id: UserId,
        lines: &[CartLine],
        shipping_address: Option<ShippingAddress>,
        payment_method: PaymentMethod,
    ) -> Result<OrderDraft, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::NoItems);
        }

        let items = lines
            .iter()
            .map(|line| {
                let unit_price = line.product.price;
                let line_total = unit_price
                    .checked_mul(line.quantity)
                    .ok_or(OrderError::AmountOverflow)?
                    .round2();
                Ok(LineItem {
                    product_id: line.product.id,
                    title: line.product.title.clone(),
                    slug: line.product.slug.clone(),
                    unit_price,
                    quantity: line.quantity,
                    line_total,
                })
            })
            .collect::<Result<Vec<LineItem>, OrderError>>()?;

        let subtotal = Money::checked_sum(items.iter().map(|i| i.line_total))
            .ok_or(OrderError::AmountOverflow)?
            .round2();
        let shipping_fee = self.shipping.shipping_fee(subtotal, &items).round2();
        let tax = self.tax.tax(subtotal, shipping_fee).round2();
        let grand_total = Money::checked_sum([subtotal, shipping_fee, tax])
            .ok_or(OrderError::AmountOverflow)?
            .round2();

        Ok(OrderDraft {
            user_id,
            items,
            shipping_address,
            payment_method,
            subtotal,
            shipping_fee,
            tax,
            grand_total,
        })
    }
}
