//! Shared application state.

use std::sync::Arc;

use checkout::{CancellationCoordinator, CartService, CheckoutCoordinator, OrderService};
use store::Store;

use crate::auth::{AuthState, IdentityProvider};

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub checkout: CheckoutCoordinator<S>,
    pub cancellation: CancellationCoordinator<S>,
    pub orders: OrderService<S>,
    pub carts: CartService<S>,
    pub identities: Arc<dyn IdentityProvider>,
}

impl<S: Store + Clone> AppState<S> {
    /// Wires every service to the same store.
    pub fn new(store: S, identities: Arc<dyn IdentityProvider>) -> Self {
        Self {
            checkout: CheckoutCoordinator::new(store.clone()),
            cancellation: CancellationCoordinator::new(store.clone()),
            orders: OrderService::new(store.clone()),
            carts: CartService::new(store),
            identities,
        }
    }
}

impl<S: Store> AuthState for AppState<S> {
    fn identities(&self) -> &dyn IdentityProvider {
        self.identities.as_ref()
    }
}
