use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use super::ApiResponse;
use crate::models::crew::{AssignedCrew, CrewRole, RoleQuotas};
use crate::models::dispatch::{Dispatch, DispatchStatus, IncidentKind, NewTrackingSample, Priority};
use crate::models::geo::GeoPoint;
use crate::models::vehicle::{Vehicle, VehicleCategory};
use crate::services::assignment_service::DispatchRequest;
use crate::services::dispatch_lifecycle::DispatchFeedback;
use crate::utils::errors::{invalid_field, AppResult};

// Request para crear un despacho
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDispatchRequest {
    pub request_ref: Option<i64>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub origin_lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub origin_lng: f64,
    #[validate(length(max = 500))]
    pub origin_address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub destination_lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub destination_lng: Option<f64>,
    #[validate(length(max = 500))]
    pub destination_address: Option<String>,
    pub priority: Option<Priority>,
    pub incident: Option<IncidentKind>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub vehicle_category: Option<VehicleCategory>,
    /// Cupos por rol, p. ej. `{"driver": 1, "paramedic": 2}`
    pub crew: Option<BTreeMap<CrewRole, u32>>,
    #[validate(range(min = 0.1, max = 500.0))]
    pub max_radius_km: Option<f64>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub traffic_factor: Option<f64>,
}

impl CreateDispatchRequest {
    pub fn into_request(self) -> AppResult<DispatchRequest> {
        let destination = match (self.destination_lat, self.destination_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            (None, None) => None,
            _ => {
                return Err(invalid_field(
                    "destination",
                    "destination_lat and destination_lng go together",
                ))
            }
        };
        Ok(DispatchRequest {
            request_ref: self.request_ref,
            origin: GeoPoint::new(self.origin_lat, self.origin_lng),
            origin_address: self.origin_address,
            destination,
            destination_address: self.destination_address,
            priority: self.priority.unwrap_or_default(),
            incident: self.incident.unwrap_or_default(),
            notes: self.notes,
            required_category: self.vehicle_category,
            role_quotas: self.crew.map(RoleQuotas::new),
            max_radius_km: self.max_radius_km,
            traffic_factor: self.traffic_factor,
        })
    }
}

// Request para dotar de recursos a un despacho pendiente
#[derive(Debug, Default, Deserialize, Validate)]
pub struct AssignPendingRequest {
    pub vehicle_category: Option<VehicleCategory>,
    pub crew: Option<BTreeMap<CrewRole, u32>>,
    #[validate(range(min = 0.1, max = 500.0))]
    pub max_radius_km: Option<f64>,
}

impl AssignPendingRequest {
    pub fn role_quotas(&self) -> Option<RoleQuotas> {
        self.crew.clone().map(RoleQuotas::new)
    }
}

// Request para cambiar el estado de un despacho
#[derive(Debug, Deserialize)]
pub struct UpdateDispatchStatusRequest {
    pub status: DispatchStatus,
}

// Request con una muestra GPS
#[derive(Debug, Deserialize, Validate)]
pub struct TrackingRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(min = 0.0, max = 400.0))]
    pub speed_kmh: Option<f64>,
    pub altitude_m: Option<f64>,
    #[validate(range(min = 0.0))]
    pub accuracy_m: Option<f64>,
    pub recorded_at: Option<DateTime<Utc>>,
}

impl TrackingRequest {
    pub fn into_sample(self, now: DateTime<Utc>) -> NewTrackingSample {
        NewTrackingSample {
            position: GeoPoint::new(self.latitude, self.longitude),
            speed_kmh: self.speed_kmh,
            altitude_m: self.altitude_m,
            accuracy_m: self.accuracy_m,
            recorded_at: self.recorded_at.unwrap_or(now),
        }
    }
}

// Request para vincular personal
#[derive(Debug, Deserialize, Validate)]
pub struct AttachCrewRequest {
    #[validate(range(min = 1))]
    pub crew_member_id: i64,
    pub role: Option<CrewRole>,
    #[serde(default)]
    pub responsible: bool,
}

// Request de feedback
#[derive(Debug, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
    #[validate(length(max = 255))]
    pub patient_outcome: Option<String>,
}

impl From<FeedbackRequest> for DispatchFeedback {
    fn from(request: FeedbackRequest) -> Self {
        Self {
            rating: request.rating,
            comment: request.comment,
            patient_outcome: request.patient_outcome,
        }
    }
}

// Query de estadísticas
#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    pub hours: Option<i64>,
}

// Response de un despacho con vehículo y personal
#[derive(Debug, Serialize)]
pub struct CreatedDispatchResponse {
    pub dispatch: Dispatch,
    pub vehicle: Vehicle,
    pub crew: Vec<AssignedCrew>,
}

// Response cuando no hay recursos para el despacho
#[derive(Debug, Serialize)]
pub struct NoResourcesResponse {
    pub reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<CrewRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<u32>,
}

/// Resultado HTTP de crear (201) o asignar (200) un despacho; 503 sin recursos
#[derive(Debug)]
pub enum DispatchOutcomeResponse {
    Created(ApiResponse<CreatedDispatchResponse>),
    Assigned(ApiResponse<CreatedDispatchResponse>),
    Unavailable(ApiResponse<NoResourcesResponse>),
}

impl IntoResponse for DispatchOutcomeResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(body) => (StatusCode::CREATED, Json(body)).into_response(),
            Self::Assigned(body) => (StatusCode::OK, Json(body)).into_response(),
            Self::Unavailable(body) => (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response(),
        }
    }
}
