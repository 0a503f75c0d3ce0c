//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::Order(order_err) => match order_err {
            OrderError::Validation(_) => StatusCode::BAD_REQUEST,
            OrderError::Unauthenticated => StatusCode::UNAUTHORIZED,
            OrderError::Forbidden(_) => StatusCode::FORBIDDEN,
            OrderError::NotFound { .. } => StatusCode::NOT_FOUND,
            OrderError::InvalidTransition { .. } | OrderError::InsufficientStock { .. } => {
                StatusCode::CONFLICT
            }
        },
        DomainError::Store(StoreError::ConcurrencyConflict { .. }) => StatusCode::CONFLICT,
        DomainError::Store(StoreError::MissingRecord { .. }) => StatusCode::NOT_FOUND,
        DomainError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}
