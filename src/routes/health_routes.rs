use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::controllers::health_controller::HealthController;
use crate::metrics;
use crate::state::AppState;

pub fn create_health_router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/services", get(services_health))
        .route("/model", get(model_evaluation))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let controller = HealthController::new(&state);
    let store_ok = controller.store_ok().await;
    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if store_ok { "healthy" } else { "unhealthy" },
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.config.environment,
            "store": store_ok,
            "timestamp": state.clock.now().to_rfc3339(),
        })),
    )
}

async fn services_health(State(state): State<AppState>) -> impl IntoResponse {
    let controller = HealthController::new(&state);
    let report = controller.services().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

async fn model_evaluation(State(state): State<AppState>) -> impl IntoResponse {
    let controller = HealthController::new(&state);
    match controller.model_evaluation().await {
        Some(metrics) => (
            StatusCode::OK,
            Json(json!({ "status": "available", "evaluation": metrics })),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "evaluation": null })),
        ),
    }
}

/// Exposición Prometheus
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}
