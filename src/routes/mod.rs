pub mod crew_routes;
pub mod dispatch_routes;
pub mod health_routes;
pub mod vehicle_routes;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::middleware::{auth_middleware, cors_layer};
use crate::state::AppState;

/// Router completo: `/api/v1` más `/metrics`
pub fn create_api_router(state: AppState) -> Router {
    let protected = Router::new()
        .nest("/vehicles", vehicle_routes::create_vehicle_router())
        .nest("/crew", crew_routes::create_crew_router())
        .nest("/dispatches", dispatch_routes::create_dispatch_router())
        .nest("/availability", dispatch_routes::create_availability_router())
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let api = Router::new()
        .merge(protected)
        .nest("/health", health_routes::create_health_router());

    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .nest("/api/v1", api)
        .route("/metrics", get(health_routes::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
