//! Eventos de ciclo de vida y filas del outbox
//!
//! Cada mutación que genera un evento lo encola en `outbox_events` dentro
//! de la misma transacción; el relay lo entrega después del commit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::{FromRow, Type};
use std::fmt;
use uuid::Uuid;

use super::crew::{CrewMember, CrewStatus};
use super::dispatch::{Dispatch, DispatchOutcomeKind, DispatchStatus};
use super::vehicle::Vehicle;

/// Nombre de evento publicado hacia los consumidores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "dispatch.created")]
    DispatchCreated,
    #[serde(rename = "dispatch.status_changed")]
    DispatchStatusChanged,
    #[serde(rename = "dispatch.concluded")]
    DispatchConcluded,
    #[serde(rename = "vehicle.location_updated")]
    VehicleLocationUpdated,
    #[serde(rename = "crew.status_changed")]
    CrewStatusChanged,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DispatchCreated => "dispatch.created",
            EventKind::DispatchStatusChanged => "dispatch.status_changed",
            EventKind::DispatchConcluded => "dispatch.concluded",
            EventKind::VehicleLocationUpdated => "vehicle.location_updated",
            EventKind::CrewStatusChanged => "crew.status_changed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            EventKind::DispatchCreated,
            EventKind::DispatchStatusChanged,
            EventKind::DispatchConcluded,
            EventKind::VehicleLocationUpdated,
            EventKind::CrewStatusChanged,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == s)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evento con payload plano de campos primitivos
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchEvent {
    pub kind: EventKind,
    pub payload: Map<String, Value>,
    pub occurred_at: DateTime<Utc>,
}

fn flat(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl DispatchEvent {
    pub fn dispatch_created(dispatch: &Dispatch, crew_count: usize, at: DateTime<Utc>) -> Self {
        Self {
            kind: EventKind::DispatchCreated,
            payload: flat(json!({
                "dispatch_id": dispatch.id,
                "request_ref": dispatch.request_ref,
                "vehicle_id": dispatch.vehicle_id,
                "status": dispatch.status.as_str(),
                "priority": dispatch.priority.as_str(),
                "incident": dispatch.incident.as_str(),
                "origin_lat": dispatch.origin_lat,
                "origin_lng": dispatch.origin_lng,
                "distance_km": dispatch.distance_km,
                "estimated_minutes": dispatch.estimated_minutes,
                "crew_count": crew_count,
            })),
            occurred_at: at,
        }
    }

    pub fn status_changed(
        dispatch: &Dispatch,
        previous: DispatchStatus,
        current: DispatchStatus,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: EventKind::DispatchStatusChanged,
            payload: flat(json!({
                "dispatch_id": dispatch.id,
                "vehicle_id": dispatch.vehicle_id,
                "previous_status": previous.as_str(),
                "status": current.as_str(),
            })),
            occurred_at: at,
        }
    }

    pub fn concluded(
        dispatch: &Dispatch,
        outcome: DispatchOutcomeKind,
        vehicle_category: Option<&str>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: EventKind::DispatchConcluded,
            payload: flat(json!({
                "dispatch_id": dispatch.id,
                "request_ref": dispatch.request_ref,
                "vehicle_id": dispatch.vehicle_id,
                "vehicle_category": vehicle_category,
                "outcome": outcome.as_str(),
                "priority": dispatch.priority.as_str(),
                "incident": dispatch.incident.as_str(),
                "distance_km": dispatch.distance_km,
                "estimated_minutes": dispatch.estimated_minutes,
                "actual_minutes": dispatch.actual_minutes,
                "requested_at": dispatch.requested_at.to_rfc3339(),
                "concluded_at": dispatch.concluded_at.map(|t| t.to_rfc3339()),
            })),
            occurred_at: at,
        }
    }

    pub fn vehicle_location_updated(vehicle: &Vehicle, at: DateTime<Utc>) -> Self {
        Self {
            kind: EventKind::VehicleLocationUpdated,
            payload: flat(json!({
                "vehicle_id": vehicle.id,
                "plate": vehicle.plate,
                "latitude": vehicle.latitude,
                "longitude": vehicle.longitude,
                "status": vehicle.status.as_str(),
            })),
            occurred_at: at,
        }
    }

    pub fn crew_status_changed(
        member: &CrewMember,
        previous: CrewStatus,
        current: CrewStatus,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: EventKind::CrewStatusChanged,
            payload: flat(json!({
                "crew_member_id": member.id,
                "role": member.role.as_str(),
                "previous_status": previous.as_str(),
                "status": current.as_str(),
            })),
            occurred_at: at,
        }
    }

    /// Campo entero del payload, si existe
    pub fn payload_i64(&self, key: &str) -> Option<i64> {
        self.payload.get(key).and_then(Value::as_i64)
    }

    /// Campo de texto del payload, si existe
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

/// Estado de entrega de una fila del outbox - mapea al ENUM outbox_status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "outbox_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Delivered,
    Dead,
}

/// Fila del outbox - mapea a la tabla outbox_events
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub event_type: String,
    pub payload: Value,
    pub status: OutboxStatus,
    pub attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl OutboxEvent {
    pub fn from_event(event: &DispatchEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event.kind.as_str().to_string(),
            payload: Value::Object(event.payload.clone()),
            status: OutboxStatus::Pending,
            attempts: 0,
            next_attempt_at: event.occurred_at,
            last_error: None,
            created_at: event.occurred_at,
            delivered_at: None,
        }
    }

    /// Reconstruye el evento de dominio; `None` si el tipo es desconocido
    pub fn to_event(&self) -> Option<DispatchEvent> {
        Some(DispatchEvent {
            kind: EventKind::parse(&self.event_type)?,
            payload: flat(self.payload.clone()),
            occurred_at: self.created_at,
        })
    }
}
