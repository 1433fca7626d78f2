use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, OrderId, ProductId, UserId};
use domain::{Cart, Money, Order, Product, StatusUpdate};

use crate::Result;

/// Core trait for store implementations.
///
/// Plain reads and single-document writes live here. Anything that touches
/// stock, or must change several documents together, goes through the
/// [`UnitOfWork`] returned by [`Store::begin`].
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens an atomic unit of work.
    ///
    /// Nothing written through the unit is visible to other readers until
    /// [`UnitOfWork::commit`] succeeds. Dropping the unit without committing
    /// discards every write.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;

    /// Inserts a catalog product.
    async fn insert_product(&self, product: &Product) -> Result<()>;

    /// Loads a product by ID, active or not.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Loads every product in `ids` that exists. Order is unspecified.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Changes a product's list price. Returns false if the product does not exist.
    ///
    /// Orders already placed keep the price captured in their line items.
    async fn set_product_price(&self, id: ProductId, price: Money) -> Result<bool>;

    /// Loads the cart owned by a user.
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>>;

    /// Creates or replaces the cart owned by `cart.user_id`.
    ///
    /// There is one cart per user; when a cart already exists for the user its
    /// identifier is kept and its items replaced.
    async fn save_cart(&self, cart: &Cart) -> Result<Cart>;

    /// Loads an order by ID.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists a user's orders, newest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Lists every order, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Assigns the given status fields. Returns the updated order, or None if absent.
    async fn update_order_status(
        &self,
        id: OrderId,
        update: StatusUpdate,
    ) -> Result<Option<Order>>;
}

/// A group of writes that is committed or discarded as a whole.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Decrements stock by `quantity` only if at least `quantity` is on hand.
    ///
    /// The check and the write are a single atomic operation. Returns false
    /// when no record matched (missing product or not enough stock).
    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool>;

    /// Increments stock by `quantity` with no upper bound.
    ///
    /// Returns false if the product no longer exists.
    async fn increment_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool>;

    /// Persists a new order.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Sets the cancellation flag if the order is still pending, unpaid and not cancelled.
    ///
    /// Returns false when no record matched.
    async fn mark_order_cancelled(&mut self, order_id: OrderId, at: DateTime<Utc>) -> Result<bool>;

    /// Empties a cart that still has items.
    ///
    /// Returns false if the cart is missing or already empty, which means a
    /// concurrent checkout consumed it.
    async fn clear_cart(&mut self, cart_id: CartId) -> Result<bool>;

    /// Makes every write of the unit visible.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every write of the unit.
    async fn rollback(self: Box<Self>) -> Result<()>;
}
