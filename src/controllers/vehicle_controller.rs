use std::sync::Arc;

use validator::Validate;

use crate::dto::vehicle_dto::{LocationUpdateRequest, NearestVehiclesQuery, VehicleListQuery};
use crate::dto::ApiResponse;
use crate::models::geo::GeoPoint;
use crate::models::vehicle::{Vehicle, VehicleStatus};
use crate::services::assignment_service::{DispatchAssignmentEngine, VehicleMatch};
use crate::services::fleet_service::FleetService;
use crate::state::AppState;
use crate::utils::errors::AppResult;

pub struct VehicleController {
    fleet: Arc<FleetService>,
    engine: Arc<DispatchAssignmentEngine>,
}

impl VehicleController {
    pub fn new(state: &AppState) -> Self {
        Self {
            fleet: state.fleet.clone(),
            engine: state.engine.clone(),
        }
    }

    pub async fn list(&self, query: &VehicleListQuery) -> AppResult<Vec<Vehicle>> {
        self.fleet.list_vehicles(&query.filter()).await
    }

    pub async fn nearest(&self, query: NearestVehiclesQuery) -> AppResult<Vec<VehicleMatch>> {
        query.validate()?;
        self.engine
            .list_vehicles_by_distance(GeoPoint::new(query.lat, query.lng), query.category, query.limit)
            .await
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<Vehicle> {
        self.fleet.get_vehicle(id).await
    }

    pub async fn update_location(
        &self,
        id: i64,
        request: LocationUpdateRequest,
    ) -> AppResult<ApiResponse<Vehicle>> {
        request.validate()?;
        let vehicle = self
            .fleet
            .update_vehicle_location(id, GeoPoint::new(request.latitude, request.longitude))
            .await?;
        Ok(ApiResponse::success(vehicle))
    }

    pub async fn update_status(
        &self,
        id: i64,
        status: VehicleStatus,
    ) -> AppResult<ApiResponse<Vehicle>> {
        let vehicle = self.fleet.set_vehicle_status(id, status).await?;
        Ok(ApiResponse::success_with_message(
            vehicle,
            format!("Vehicle status set to '{}'", status),
        ))
    }
}
