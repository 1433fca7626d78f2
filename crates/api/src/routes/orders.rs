//! Checkout, order read and cancellation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::CheckoutRequest;
use common::OrderId;
use domain::{Order, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress, StatusUpdate};
use serde::Deserialize;
use store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{Validate, ValidJson, ValidJsonOrDefault, ValidationErrors, parse_path};

const MAX_ADDRESS_FIELD_LEN: usize = 200;

// -- Request types --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateOrderRequest {
    #[serde(alias = "shippingAddress")]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(alias = "paymentMethod")]
    pub payment_method: Option<PaymentMethod>,
}

impl Validate for CreateOrderRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(address) = &self.shipping_address {
            let fields = [
                ("full_name", &address.full_name),
                ("phone", &address.phone),
                ("line1", &address.line1),
                ("line2", &address.line2),
                ("city", &address.city),
                ("state", &address.state),
                ("postal_code", &address.postal_code),
                ("country", &address.country),
            ];
            for (name, value) in fields {
                if let Some(value) = value
                    && value.chars().count() > MAX_ADDRESS_FIELD_LEN
                {
                    errors.add(
                        format!("shipping_address.{name}"),
                        format!("must be at most {MAX_ADDRESS_FIELD_LEN} characters"),
                    );
                }
            }
        }
        errors.into_result()
    }
}

impl From<CreateOrderRequest> for CheckoutRequest {
    fn from(req: CreateOrderRequest) -> Self {
        CheckoutRequest {
            shipping_address: req.shipping_address,
            payment_method: req.payment_method.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateStatusRequest {
    pub status: Option<OrderStatus>,
    #[serde(alias = "paymentStatus")]
    pub payment_status: Option<PaymentStatus>,
}

impl Validate for UpdateStatusRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        if self.status.is_none() && self.payment_status.is_none() {
            return Err(ValidationErrors::single(
                "status",
                "status or payment_status is required",
            ));
        }
        Ok(())
    }
}

// -- Handlers --

/// POST /orders: check out the caller's cart.
///
/// The body is optional. Without one the order has no shipping address and
/// uses the default payment method.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.0.user_id))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ValidJsonOrDefault(req): ValidJsonOrDefault<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state
        .checkout
        .place_order(user.0.user_id, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: the caller's orders, newest first.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.user_id))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_for_user(user.0.user_id).await?))
}

/// GET /orders/{id}: a single order visible to the caller.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.user_id))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_path("id", &id)?;
    Ok(Json(state.orders.get_order(order_id, &user.0).await?))
}

/// DELETE /orders/{id}: cancel a pending, unpaid order.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.user_id))]
pub async fn cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_path("id", &id)?;
    Ok(Json(state.cancellation.cancel(order_id, &user.0).await?))
}

/// GET /admin/orders: every order, newest first.
#[tracing::instrument(skip(state, user), fields(user_id = %user.0.user_id))]
pub async fn list_all<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_all(&user.0).await?))
}

/// PATCH /admin/orders/{id}/status: assign order and payment status.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.0.user_id))]
pub async fn update_status<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_path("id", &id)?;
    let update = StatusUpdate {
        status: req.status,
        payment_status: req.payment_status,
    };
    Ok(Json(
        state.orders.update_status(&user.0, order_id, update).await?,
    ))
}
