//! API error types with HTTP response mapping.

use std::error::Error as _;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::OrderError;

use crate::validation::ValidationErrors;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or unknown bearer credential.
    Unauthorized(String),
    /// Malformed request body or path.
    Validation(ValidationErrors),
    /// Checkout, cancellation or order access error.
    Checkout(CheckoutError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Checkout(err) => checkout_status(err),
        }
    }
}

fn checkout_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::EmptyCart
        | CheckoutError::ProductUnavailable { .. }
        | CheckoutError::InsufficientStock { .. }
        | CheckoutError::InvalidRequest(_)
        | CheckoutError::Order(
            OrderError::NoItems
            | OrderError::AmountOverflow
            | OrderError::AlreadyCancelled
            | OrderError::CancelNotAllowed { .. },
        ) => StatusCode::BAD_REQUEST,
        CheckoutError::Forbidden(_) => StatusCode::FORBIDDEN,
        CheckoutError::OrderNotFound(_) | CheckoutError::ProductNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        CheckoutError::StockConflict { .. }
        | CheckoutError::CheckoutFailed(_)
        | CheckoutError::CancelFailed { .. }
        | CheckoutError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_chain(err: &CheckoutError) -> Vec<String> {
    let mut chain = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = serde_json::json!({ "status": status.as_u16() });

        match &self {
            ApiError::Unauthorized(msg) => {
                body["message"] = msg.as_str().into();
            }
            ApiError::Validation(errors) => {
                body["message"] = "Validation failed".into();
                body["errors"] = serde_json::to_value(errors).unwrap_or_default();
            }
            ApiError::Checkout(err) => {
                body["message"] = err.to_string().into();
                if cfg!(debug_assertions) {
                    body["detail"] = error_chain(err).into();
                }
            }
        }

        metrics::counter!("http_errors_total", "status" => status.as_str().to_owned()).increment(1);
        if status.is_server_error() {
            tracing::error!(error = ?self, "internal server error");
        }

        (status, axum::Json(body)).into_response()
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}
