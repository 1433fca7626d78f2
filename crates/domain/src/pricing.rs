//! Shipping and tax policies applied by the order builder.

use crate::money::Money;
use crate::order::LineItem;

/// Computes the shipping fee for an order.
pub trait ShippingPolicy: Send + Sync {
    fn shipping_fee(&self, subtotal: Money, items: &[LineItem]) -> Money;
}

/// Computes the tax owed on an order.
pub trait TaxPolicy: Send + Sync {
    fn tax(&self, subtotal: Money, shipping_fee: Money) -> Money;
}

/// Ships everything for free.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeShipping;

impl ShippingPolicy for FreeShipping {
    fn shipping_fee(&self, _subtotal: Money, _items: &[LineItem]) -> Money {
        Money::zero()
    }
}

/// Charges a fixed fee per order.
#[derive(Debug, Clone, Copy)]
pub struct FlatRateShipping(pub Money);

impl ShippingPolicy for FlatRateShipping {
    fn shipping_fee(&self, _subtotal: Money, _items: &[LineItem]) -> Money {
        self.0
    }
}

/// Charges no tax.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTax;

impl TaxPolicy for NoTax {
    fn tax(&self, _subtotal: Money, _shipping_fee: Money) -> Money {
        Money::zero()
    }
}
