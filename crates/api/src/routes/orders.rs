//! Customer-facing order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{
    ListOrders, OrderDetail, OrderService, OrderSummary, PagedOrders, PlaceOrder,
    PrincipalResolver,
};
use store::Store;

use crate::auth::CurrentPrincipal;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub order_service: OrderService<S>,
    pub principals: PrincipalResolver<S>,
    pub store: S,
}

/// POST /api/v1/orders/create — place an order for the caller.
#[tracing::instrument(skip(state, principal, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentPrincipal(principal): CurrentPrincipal,
    ApiJson(req): ApiJson<PlaceOrder>,
) -> Result<(StatusCode, Json<OrderSummary>), ApiError> {
    let summary = state.order_service.create_order(&principal, req).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// GET /api/v1/orders/paging — the caller's orders (every order for
/// administrators), newest first.
#[tracing::instrument(skip(state, principal))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentPrincipal(principal): CurrentPrincipal,
    ApiQuery(params): ApiQuery<ListOrders>,
) -> Result<Json<PagedOrders>, ApiError> {
    let page = state.order_service.list_orders(&principal, params).await?;
    Ok(Json(page))
}

/// PUT /api/v1/orders/:id/cancel — cancel an order.
///
/// Administrators cancel as operators; everyone else may only cancel their
/// own pending orders.
#[tracing::instrument(skip(state, principal))]
pub async fn cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<String>,
) -> Result<Json<OrderSummary>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let summary = state.order_service.cancel_order(&principal, order_id).await?;
    Ok(Json(summary))
}

/// GET /api/v1/orders/:id/detail — one order with audit fields.
#[tracing::instrument(skip(state, principal))]
pub async fn detail<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let detail = state
        .order_service
        .get_order_detail(&principal, order_id)
        .await?;
    Ok(Json(detail))
}

pub(crate) fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
