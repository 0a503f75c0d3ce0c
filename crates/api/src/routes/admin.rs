//! Administrator order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::{ListOrders, OrderSummary, PagedOrders};
use serde::Deserialize;
use store::Store;

use super::orders::{AppState, parse_order_id};
use crate::auth::CurrentPrincipal;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// GET /api/v1/admin/orders — every account's orders, optionally by status.
#[tracing::instrument(skip(state, principal))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentPrincipal(principal): CurrentPrincipal,
    ApiQuery(params): ApiQuery<ListOrders>,
) -> Result<Json<PagedOrders>, ApiError> {
    let page = state
        .order_service
        .admin_list_orders(&principal, params)
        .await?;
    Ok(Json(page))
}

/// PUT /api/v1/admin/orders/:id/status — move an order to a new status.
#[tracing::instrument(skip(state, principal))]
pub async fn update_status<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> Result<Json<OrderSummary>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let summary = state
        .order_service
        .update_status(&principal, order_id, &req.status)
        .await?;
    Ok(Json(summary))
}
