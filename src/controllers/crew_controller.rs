use std::sync::Arc;

use crate::dto::ApiResponse;
use crate::models::crew::{CrewFilter, CrewMember, CrewStatus};
use crate::services::fleet_service::FleetService;
use crate::state::AppState;
use crate::utils::errors::AppResult;

pub struct CrewController {
    fleet: Arc<FleetService>,
}

impl CrewController {
    pub fn new(state: &AppState) -> Self {
        Self {
            fleet: state.fleet.clone(),
        }
    }

    pub async fn list(&self, filter: &CrewFilter) -> AppResult<Vec<CrewMember>> {
        self.fleet.list_crew(filter).await
    }

    pub async fn update_status(
        &self,
        id: i64,
        status: CrewStatus,
    ) -> AppResult<ApiResponse<CrewMember>> {
        let member = self.fleet.set_crew_status(id, status).await?;
        Ok(ApiResponse::success_with_message(
            member,
            format!("Crew member status set to '{}'", status),
        ))
    }
}
