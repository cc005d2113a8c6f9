use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};

use crate::controllers::vehicle_controller::VehicleController;
use crate::dto::vehicle_dto::{
    LocationUpdateRequest, NearestVehiclesQuery, VehicleListQuery, VehicleStatusRequest,
};
use crate::dto::ApiResponse;
use crate::models::vehicle::Vehicle;
use crate::services::assignment_service::VehicleMatch;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vehicles))
        .route("/nearest", get(nearest_vehicles))
        .route("/:id", get(get_vehicle))
        .route("/:id/location", post(update_location))
        .route("/:id/status", patch(update_status))
}

async fn list_vehicles(
    State(state): State<AppState>,
    Query(query): Query<VehicleListQuery>,
) -> Result<Json<Vec<Vehicle>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.list(&query).await?;
    Ok(Json(response))
}

async fn nearest_vehicles(
    State(state): State<AppState>,
    Query(query): Query<NearestVehiclesQuery>,
) -> Result<Json<Vec<VehicleMatch>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.nearest(query).await?;
    Ok(Json(response))
}

async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vehicle>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.get_by_id(id).await?;
    Ok(Json(response))
}

async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<LocationUpdateRequest>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.update_location(id, request).await?;
    Ok(Json(response))
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<VehicleStatusRequest>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let controller = VehicleController::new(&state);
    let response = controller.update_status(id, request.status).await?;
    Ok(Json(response))
}
