use serde::Deserialize;
use validator::Validate;

use crate::models::vehicle::{VehicleCategory, VehicleFilter, VehicleStatus};

// Query de listado de vehículos
#[derive(Debug, Default, Deserialize)]
pub struct VehicleListQuery {
    pub status: Option<VehicleStatus>,
    pub category: Option<VehicleCategory>,
    #[serde(default)]
    pub available_only: bool,
}

impl VehicleListQuery {
    pub fn filter(&self) -> VehicleFilter {
        VehicleFilter {
            status: if self.available_only {
                Some(VehicleStatus::Available)
            } else {
                self.status
            },
            category: self.category,
        }
    }
}

// Query de candidatos por distancia
#[derive(Debug, Deserialize, Validate)]
pub struct NearestVehiclesQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    pub category: Option<VehicleCategory>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

// Request de actualización de posición
#[derive(Debug, Deserialize, Validate)]
pub struct LocationUpdateRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

// Request de cambio de estado del vehículo
#[derive(Debug, Deserialize)]
pub struct VehicleStatusRequest {
    pub status: VehicleStatus,
}
