//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ProductId;
use domain::Cart;
use serde::Deserialize;
use store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{Validate, ValidJson, ValidationErrors, parse_path};

/// Largest quantity accepted in a single add.
const MAX_QUANTITY: u32 = 999;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl Validate for AddItemRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if !(1..=MAX_QUANTITY).contains(&self.quantity) {
            errors.add(
                "quantity",
                format!("must be between 1 and {MAX_QUANTITY}"),
            );
        }
        errors.into_result()
    }
}

/// GET /cart: the caller's cart, empty if none was saved yet.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.user_id))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<Cart>, ApiError> {
    Ok(Json(state.carts.get_cart(user.0.user_id).await?))
}

/// POST /cart/items: add units of a product.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.0.user_id))]
pub async fn add_item<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ValidJson(req): ValidJson<AddItemRequest>,
) -> Result<Json<Cart>, ApiError> {
    let cart = state
        .carts
        .add_item(user.0.user_id, req.product_id, req.quantity)
        .await?;
    Ok(Json(cart))
}

/// DELETE /cart/items/{product_id}: drop a product's line.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.user_id))]
pub async fn remove_item<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(product_id): Path<String>,
) -> Result<Json<Cart>, ApiError> {
    let product_id: ProductId = parse_path("product_id", &product_id)?;
    Ok(Json(
        state.carts.remove_item(user.0.user_id, product_id).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_bounds() {
        let mut req = AddItemRequest {
            product_id: ProductId::new(),
            quantity: 0,
        };
        assert!(req.validate().is_err());
        req.quantity = 1;
        assert!(req.validate().is_ok());
        req.quantity = MAX_QUANTITY + 1;
        assert!(req.validate().is_err());
    }
}
