use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};

use crate::controllers::crew_controller::CrewController;
use crate::dto::crew_dto::CrewStatusRequest;
use crate::dto::ApiResponse;
use crate::models::crew::{CrewFilter, CrewMember};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_crew_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_crew))
        .route("/:id/status", patch(update_status))
}

async fn list_crew(
    State(state): State<AppState>,
    Query(filter): Query<CrewFilter>,
) -> Result<Json<Vec<CrewMember>>, AppError> {
    let controller = CrewController::new(&state);
    let response = controller.list(&filter).await?;
    Ok(Json(response))
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<CrewStatusRequest>,
) -> Result<Json<ApiResponse<CrewMember>>, AppError> {
    let controller = CrewController::new(&state);
    let response = controller.update_status(id, request.status).await?;
    Ok(Json(response))
}
