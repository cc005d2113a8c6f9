use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};

use crate::controllers::dispatch_controller::DispatchController;
use crate::dto::dispatch_dto::{
    AssignPendingRequest, AttachCrewRequest, CreateDispatchRequest, DispatchOutcomeResponse,
    FeedbackRequest, StatisticsQuery, TrackingRequest, UpdateDispatchStatusRequest,
};
use crate::dto::ApiResponse;
use crate::models::analytics::{AvailabilitySnapshot, DispatchStatistics};
use crate::models::crew::AssignmentLink;
use crate::models::dispatch::{Dispatch, DispatchFilter, TrackingSample};
use crate::services::assignment_service::VehicleSuggestion;
use crate::services::dispatch_lifecycle::DispatchDetails;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_dispatch_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_dispatch))
        .route("/", get(list_dispatches))
        .route("/statistics", get(statistics))
        .route("/:id", get(get_dispatch))
        .route("/:id/assign", post(assign_dispatch))
        .route("/:id/suggestion", get(suggestion))
        .route("/:id/status", patch(update_status))
        .route("/:id/tracking", post(record_tracking))
        .route("/:id/crew", post(attach_crew))
        .route("/:id/crew/:crew_id", delete(detach_crew))
        .route("/:id/feedback", post(add_feedback))
}

pub fn create_availability_router() -> Router<AppState> {
    Router::new().route("/", get(availability))
}

async fn create_dispatch(
    State(state): State<AppState>,
    Json(request): Json<CreateDispatchRequest>,
) -> Result<DispatchOutcomeResponse, AppError> {
    let controller = DispatchController::new(&state);
    controller.create(request).await
}

async fn assign_dispatch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AssignPendingRequest>,
) -> Result<DispatchOutcomeResponse, AppError> {
    let controller = DispatchController::new(&state);
    controller.assign(id, request).await
}

async fn list_dispatches(
    State(state): State<AppState>,
    Query(filter): Query<DispatchFilter>,
) -> Result<Json<Vec<Dispatch>>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.list(&filter).await?;
    Ok(Json(response))
}

async fn get_dispatch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DispatchDetails>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.get(id).await?;
    Ok(Json(response))
}

async fn suggestion(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<VehicleSuggestion>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.suggestion(id).await?;
    Ok(Json(response))
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateDispatchStatusRequest>,
) -> Result<Json<ApiResponse<Dispatch>>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.update_status(id, request.status).await?;
    Ok(Json(response))
}

async fn record_tracking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<TrackingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TrackingSample>>), AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.record_tracking(id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn attach_crew(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AttachCrewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AssignmentLink>>), AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.attach_crew(id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn detach_crew(
    State(state): State<AppState>,
    Path((id, crew_id)): Path<(i64, i64)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let controller = DispatchController::new(&state);
    controller.detach_crew(id, crew_id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Crew member detached"
    })))
}

async fn add_feedback(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<ApiResponse<Dispatch>>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.add_feedback(id, request).await?;
    Ok(Json(response))
}

async fn statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<DispatchStatistics>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.statistics(query.hours).await?;
    Ok(Json(response))
}

async fn availability(
    State(state): State<AppState>,
) -> Result<Json<AvailabilitySnapshot>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.availability().await?;
    Ok(Json(response))
}
