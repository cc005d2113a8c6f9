use std::sync::Arc;

use tracing::info;
use validator::Validate;

use crate::dto::dispatch_dto::{
    AssignPendingRequest, AttachCrewRequest, CreateDispatchRequest, CreatedDispatchResponse,
    DispatchOutcomeResponse, FeedbackRequest, NoResourcesResponse, TrackingRequest,
};
use crate::dto::ApiResponse;
use crate::models::analytics::{AvailabilitySnapshot, DispatchStatistics};
use crate::models::crew::AssignmentLink;
use crate::models::dispatch::{Dispatch, DispatchFilter, DispatchStatus, TrackingSample};
use crate::services::assignment_service::{
    DispatchAssignmentEngine, DispatchOutcome, VehicleSuggestion,
};
use crate::services::dispatch_lifecycle::{DispatchDetails, DispatchLifecycle};
use crate::services::fleet_service::FleetService;
use crate::state::AppState;
use crate::utils::clock::Clock;
use crate::utils::errors::AppResult;

const DEFAULT_STATISTICS_HOURS: i64 = 24;

pub struct DispatchController {
    engine: Arc<DispatchAssignmentEngine>,
    lifecycle: Arc<DispatchLifecycle>,
    fleet: Arc<FleetService>,
    clock: Arc<dyn Clock>,
}

impl DispatchController {
    pub fn new(state: &AppState) -> Self {
        Self {
            engine: state.engine.clone(),
            lifecycle: state.lifecycle.clone(),
            fleet: state.fleet.clone(),
            clock: state.clock.clone(),
        }
    }

    pub async fn create(&self, request: CreateDispatchRequest) -> AppResult<DispatchOutcomeResponse> {
        request.validate()?;
        let request = request.into_request()?;
        let outcome = self.engine.create_dispatch(request).await?;
        Ok(Self::outcome_response(outcome, false))
    }

    pub async fn assign(
        &self,
        id: i64,
        request: AssignPendingRequest,
    ) -> AppResult<DispatchOutcomeResponse> {
        request.validate()?;
        let outcome = self
            .engine
            .assign_pending(
                id,
                request.role_quotas(),
                request.vehicle_category,
                request.max_radius_km,
            )
            .await?;
        Ok(Self::outcome_response(outcome, true))
    }

    fn outcome_response(outcome: DispatchOutcome, assigned: bool) -> DispatchOutcomeResponse {
        match outcome {
            DispatchOutcome::Created {
                dispatch,
                vehicle,
                crew,
            } => {
                info!(
                    dispatch_id = dispatch.id,
                    vehicle_id = vehicle.id,
                    "🚑 Despacho {} con {} tripulantes",
                    dispatch.id,
                    crew.len()
                );
                let body = CreatedDispatchResponse {
                    dispatch,
                    vehicle,
                    crew,
                };
                if assigned {
                    DispatchOutcomeResponse::Assigned(ApiResponse::success_with_message(
                        body,
                        "Dispatch assigned",
                    ))
                } else {
                    DispatchOutcomeResponse::Created(ApiResponse::success_with_message(
                        body,
                        "Dispatch created",
                    ))
                }
            }
            DispatchOutcome::NoVehicle => DispatchOutcomeResponse::Unavailable(ApiResponse {
                success: false,
                message: Some("No ambulance available within the search radius".to_string()),
                data: Some(NoResourcesResponse {
                    reason: "no_vehicle",
                    role: None,
                    required: None,
                    available: None,
                }),
            }),
            DispatchOutcome::NoCrew {
                role,
                required,
                available,
            } => DispatchOutcomeResponse::Unavailable(ApiResponse {
                success: false,
                message: Some(format!(
                    "Not enough available crew for role '{}': {} required, {} available",
                    role, required, available
                )),
                data: Some(NoResourcesResponse {
                    reason: "no_crew",
                    role: Some(role),
                    required: Some(required),
                    available: Some(available),
                }),
            }),
        }
    }

    pub async fn suggestion(&self, id: i64) -> AppResult<VehicleSuggestion> {
        self.engine.suggest_vehicle(id).await
    }

    pub async fn get(&self, id: i64) -> AppResult<DispatchDetails> {
        self.lifecycle.details(id).await
    }

    pub async fn list(&self, filter: &DispatchFilter) -> AppResult<Vec<Dispatch>> {
        self.lifecycle.list(filter).await
    }

    pub async fn update_status(
        &self,
        id: i64,
        status: DispatchStatus,
    ) -> AppResult<ApiResponse<Dispatch>> {
        let dispatch = self.lifecycle.transition(id, status).await?;
        Ok(ApiResponse::success_with_message(
            dispatch,
            format!("Dispatch moved to '{}'", status),
        ))
    }

    pub async fn record_tracking(
        &self,
        id: i64,
        request: TrackingRequest,
    ) -> AppResult<ApiResponse<TrackingSample>> {
        request.validate()?;
        let sample = request.into_sample(self.clock.now());
        let stored = self.lifecycle.record_tracking(id, sample).await?;
        Ok(ApiResponse::success(stored))
    }

    pub async fn attach_crew(
        &self,
        id: i64,
        request: AttachCrewRequest,
    ) -> AppResult<ApiResponse<AssignmentLink>> {
        request.validate()?;
        let link = self
            .fleet
            .attach_crew(id, request.crew_member_id, request.role, request.responsible)
            .await?;
        Ok(ApiResponse::success_with_message(link, "Crew member attached"))
    }

    pub async fn detach_crew(&self, id: i64, crew_member_id: i64) -> AppResult<()> {
        self.fleet.detach_crew(id, crew_member_id).await
    }

    pub async fn add_feedback(
        &self,
        id: i64,
        request: FeedbackRequest,
    ) -> AppResult<ApiResponse<Dispatch>> {
        request.validate()?;
        let dispatch = self.lifecycle.add_feedback(id, request.into()).await?;
        Ok(ApiResponse::success_with_message(dispatch, "Feedback recorded"))
    }

    pub async fn statistics(&self, hours: Option<i64>) -> AppResult<DispatchStatistics> {
        self.engine
            .dispatch_statistics(hours.unwrap_or(DEFAULT_STATISTICS_HOURS))
            .await
    }

    pub async fn availability(&self) -> AppResult<AvailabilitySnapshot> {
        self.engine.availability_snapshot().await
    }
}
