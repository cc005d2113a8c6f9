use serde::Deserialize;

use crate::models::crew::CrewStatus;

// Request de cambio de estado del personal
#[derive(Debug, Deserialize)]
pub struct CrewStatusRequest {
    pub status: CrewStatus,
}
