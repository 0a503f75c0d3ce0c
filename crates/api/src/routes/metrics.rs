//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics::Unit;
use metrics_exporter_prometheus::PrometheusHandle;

/// Registers descriptions for the order metrics.
pub fn describe() {
    metrics::describe_counter!("orders_created_total", "Orders placed");
    metrics::describe_counter!(
        "orders_cancelled_total",
        "Orders moved to CANCELLED by any path"
    );
    metrics::describe_counter!(
        "order_status_updates_total",
        "Committed status changes, labelled by destination status"
    );
    metrics::describe_counter!(
        "order_commit_conflicts_total",
        "Commits rejected by an optimistic concurrency check"
    );
    metrics::describe_histogram!(
        "order_create_duration_seconds",
        Unit::Seconds,
        "Time spent placing an order, including retries"
    );
}

/// GET /metrics — returns Prometheus-formatted metrics.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
