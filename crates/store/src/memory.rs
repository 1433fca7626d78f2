use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, OrderId, ProductId, UserId};
use domain::{Cart, Money, Order, OrderStatus, PaymentStatus, Product, StatusUpdate};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::{
    Result, StoreError,
    store::{Store, UnitOfWork},
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    carts: HashMap<UserId, Cart>,
    orders: HashMap<OrderId, Order>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_on_order_insert: AtomicBool,
    fail_on_cart_clear: AtomicBool,
}

/// In-memory store implementation for testing and local runs.
///
/// A unit of work holds the store's write lock for its whole lifetime and
/// edits a private copy of the state, which replaces the shared state only on
/// commit. Units are therefore serializable and readers never observe a
/// partially applied unit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
    faults: Arc<Faults>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures units of work to fail when inserting an order.
    pub fn set_fail_on_order_insert(&self, fail: bool) {
        self.faults.fail_on_order_insert.store(fail, Ordering::SeqCst);
    }

    /// Configures units of work to fail when clearing a cart.
    pub fn set_fail_on_cart_clear(&self, fail: bool) {
        self.faults.fail_on_cart_clear.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the current stock of a product, if it exists.
    pub async fn stock_of(&self, product_id: ProductId) -> Option<u32> {
        self.state
            .read()
            .await
            .products
            .get(&product_id)
            .map(|p| p.stock)
    }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().write_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(InMemoryUnitOfWork {
            guard,
            working,
            faults: self.faults.clone(),
        }))
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.write().await;
        if state.products.values().any(|p| p.slug == product.slug) {
            return Err(StoreError::Conflict(format!(
                "slug '{}' is already taken",
                product.slug
            )));
        }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    async fn set_product_price(&self, id: ProductId, price: Money) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.products.get_mut(&id) {
            Some(product) => {
                product.price = price;
                product.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        Ok(self.state.read().await.carts.get(&user_id).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<Cart> {
        let mut state = self.state.write().await;
        let saved = match state.carts.get(&cart.user_id) {
            Some(existing) => Cart {
                id: existing.id,
                ..cart.clone()
            },
            None => cart.clone(),
        };
        state.carts.insert(saved.user_id, saved.clone());
        Ok(saved)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(newest_first(
            state
                .orders
                .values()
                .filter(|o| o.user_id == user_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(newest_first(state.orders.values().cloned().collect()))
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        update: StatusUpdate,
    ) -> Result<Option<Order>> {
        let mut state = self.state.write().await;
        Ok(state.orders.get_mut(&id).map(|order| {
            order.apply_status_update(&update, Utc::now());
            order.clone()
        }))
    }
}

struct InMemoryUnitOfWork {
    guard: OwnedRwLockWriteGuard<MemoryState>,
    working: MemoryState,
    faults: Arc<Faults>,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool> {
        match self.working.products.get_mut(&product_id) {
            Some(product) if product.stock >= quantity => {
                product.stock -= quantity;
                product.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool> {
        match self.working.products.get_mut(&product_id) {
            Some(product) => {
                product.stock = product.stock.checked_add(quantity).ok_or_else(|| {
                    StoreError::InvalidData(format!("stock overflow for product {product_id}"))
                })?;
                product.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        if self.faults.fail_on_order_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("order insert failed".to_string()));
        }
        if self.working.orders.contains_key(&order.id) {
            return Err(StoreError::Conflict(format!("order {} already exists", order.id)));
        }
        self.working.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn mark_order_cancelled(&mut self, order_id: OrderId, at: DateTime<Utc>) -> Result<bool> {
        match self.working.orders.get_mut(&order_id) {
            Some(order)
                if !order.cancelled
                    && order.status == OrderStatus::Pending
                    && order.payment_status == PaymentStatus::Unpaid =>
            {
                order.mark_cancelled(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_cart(&mut self, cart_id: CartId) -> Result<bool> {
        if self.faults.fail_on_cart_clear.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("cart clear failed".to_string()));
        }
        match self
            .working
            .carts
            .values_mut()
            .find(|c| c.id == cart_id && !c.is_empty())
        {
            Some(cart) => {
                cart.clear();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryUnitOfWork {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        // Dropping the guard releases the lock; the working copy is discarded.
        Ok(())
    }
}
