//! Modelo de Dispatch (despacho)
//!
//! Un despacho es un episodio de respuesta de emergencia desde la
//! solicitud hasta su conclusión. Las transiciones de estado válidas
//! están definidas en una tabla explícita (`DispatchStatus::allowed_next`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt;
use std::str::FromStr;

use super::geo::GeoPoint;

/// Estado del despacho - mapea al ENUM dispatch_status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[sqlx(type_name = "dispatch_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Pending,
    Assigned,
    EnRoute,
    OnScene,
    Transporting,
    Completed,
    Cancelled,
}

impl DispatchStatus {
    pub const ALL: [DispatchStatus; 7] = [
        DispatchStatus::Pending,
        DispatchStatus::Assigned,
        DispatchStatus::EnRoute,
        DispatchStatus::OnScene,
        DispatchStatus::Transporting,
        DispatchStatus::Completed,
        DispatchStatus::Cancelled,
    ];

    /// Estados con vehículo y personal comprometidos
    pub const ACTIVE: [DispatchStatus; 4] = [
        DispatchStatus::Assigned,
        DispatchStatus::EnRoute,
        DispatchStatus::OnScene,
        DispatchStatus::Transporting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Pending => "pending",
            DispatchStatus::Assigned => "assigned",
            DispatchStatus::EnRoute => "en_route",
            DispatchStatus::OnScene => "on_scene",
            DispatchStatus::Transporting => "transporting",
            DispatchStatus::Completed => "completed",
            DispatchStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DispatchStatus::Completed | DispatchStatus::Cancelled)
    }

    /// Tabla de transiciones permitidas
    pub fn allowed_next(&self) -> &'static [DispatchStatus] {
        use DispatchStatus::*;
        match self {
            Pending => &[Assigned, Cancelled],
            Assigned => &[EnRoute, Cancelled],
            EnRoute => &[OnScene],
            OnScene => &[Transporting],
            Transporting => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: DispatchStatus) -> bool {
        self.allowed_next().contains(&next)
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DispatchStatus::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown dispatch status '{}'", s))
    }
}

/// Resultado con el que se concluye un despacho
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcomeKind {
    Completed,
    Cancelled,
}

impl DispatchOutcomeKind {
    pub fn status(&self) -> DispatchStatus {
        match self {
            DispatchOutcomeKind::Completed => DispatchStatus::Completed,
            DispatchOutcomeKind::Cancelled => DispatchStatus::Cancelled,
        }
    }

    pub fn from_status(status: DispatchStatus) -> Option<Self> {
        match status {
            DispatchStatus::Completed => Some(DispatchOutcomeKind::Completed),
            DispatchStatus::Cancelled => Some(DispatchOutcomeKind::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.status().as_str()
    }
}

/// Prioridad - mapea al ENUM dispatch_priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, Type)]
#[sqlx(type_name = "dispatch_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categoría del incidente - mapea al ENUM incident_kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Type)]
#[sqlx(type_name = "incident_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    Accident,
    #[default]
    MedicalEmergency,
    Transfer,
    Other,
}

impl IncidentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentKind::Accident => "accident",
            IncidentKind::MedicalEmergency => "medical_emergency",
            IncidentKind::Transfer => "transfer",
            IncidentKind::Other => "other",
        }
    }
}

/// Despacho - mapea exactamente a la tabla dispatches
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Dispatch {
    pub id: i64,
    pub request_ref: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub origin_address: Option<String>,
    pub destination_lat: Option<f64>,
    pub destination_lng: Option<f64>,
    pub destination_address: Option<String>,
    pub distance_km: Option<f64>,
    pub estimated_minutes: Option<i32>,
    pub actual_minutes: Option<i32>,
    pub status: DispatchStatus,
    pub priority: Priority,
    pub incident: IncidentKind,
    pub notes: Option<String>,
    pub supplementary: Option<serde_json::Value>,
    pub requested_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub concluded_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Dispatch {
    pub fn origin(&self) -> GeoPoint {
        GeoPoint::new(self.origin_lat, self.origin_lng)
    }

    pub fn destination(&self) -> Option<GeoPoint> {
        GeoPoint::from_parts(self.destination_lat, self.destination_lng)
    }

    /// Minutos reales de respuesta: desde la asignación hasta la llegada,
    /// o hasta la conclusión si nunca se registró la llegada.
    pub fn actual_duration_minutes(&self, concluded_at: DateTime<Utc>) -> Option<i32> {
        let assigned = self.assigned_at?;
        let end = self.arrived_at.unwrap_or(concluded_at);
        let minutes = (end - assigned).num_minutes().max(0);
        Some(i32::try_from(minutes).unwrap_or(i32::MAX))
    }
}

/// Fila nueva de despacho, tal como la crea el motor de asignación
#[derive(Debug, Clone)]
pub struct NewDispatch {
    pub request_ref: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub origin: GeoPoint,
    pub origin_address: Option<String>,
    pub destination: Option<GeoPoint>,
    pub destination_address: Option<String>,
    pub distance_km: Option<f64>,
    pub estimated_minutes: Option<i32>,
    pub status: DispatchStatus,
    pub priority: Priority,
    pub incident: IncidentKind,
    pub notes: Option<String>,
    pub supplementary: Option<serde_json::Value>,
    pub requested_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
}

/// Muestra de rastreo GPS - mapea a la tabla tracking_samples
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrackingSample {
    pub id: i64,
    pub dispatch_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmh: Option<f64>,
    pub altitude_m: Option<f64>,
    pub accuracy_m: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// Muestra de rastreo entrante
#[derive(Debug, Clone, Copy)]
pub struct NewTrackingSample {
    pub position: GeoPoint,
    pub speed_kmh: Option<f64>,
    pub altitude_m: Option<f64>,
    pub accuracy_m: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// Filtros para listados de despachos
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatchFilter {
    pub status: Option<DispatchStatus>,
    pub priority: Option<Priority>,
    #[serde(default)]
    pub active_only: bool,
    pub requested_since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl DispatchFilter {
    pub fn matches(&self, dispatch: &Dispatch) -> bool {
        self.status.map_or(true, |s| dispatch.status == s)
            && self.priority.map_or(true, |p| dispatch.priority == p)
            && (!self.active_only || dispatch.status.is_active())
            && self
                .requested_since
                .map_or(true, |since| dispatch.requested_at >= since)
    }
}
