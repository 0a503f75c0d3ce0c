//! HTTP API server with observability for the order backend.
//!
//! Provides REST endpoints for placing, listing, cancelling, and
//! administering orders, with structured logging (tracing) and Prometheus
//! metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use domain::{OrderConfig, OrderService, PrincipalResolver};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/orders/create", post(routes::orders::create::<S>))
        .route("/orders/paging", get(routes::orders::list::<S>))
        .route("/orders/{id}/cancel", put(routes::orders::cancel::<S>))
        .route("/orders/{id}/detail", get(routes::orders::detail::<S>))
        .route("/admin/orders", get(routes::admin::list::<S>))
        .route(
            "/admin/orders/{id}/status",
            put(routes::admin::update_status::<S>),
        );

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .nest("/api/v1", api)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around `store`.
pub fn create_default_state<S: Store + Clone + 'static>(
    store: S,
    config: OrderConfig,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        order_service: OrderService::with_config(store.clone(), config),
        principals: PrincipalResolver::new(store.clone()),
        store,
    })
}
