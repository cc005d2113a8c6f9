//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos que mapean al schema
//! PostgreSQL del servicio de despacho (ver `migrations/`).

pub mod analytics;
pub mod crew;
pub mod dispatch;
pub mod event;
pub mod geo;
pub mod vehicle;

pub use analytics::{AvailabilitySnapshot, DispatchStatistics, ResourceCounts};
pub use crew::{AssignedCrew, AssignmentLink, CrewFilter, CrewMember, CrewRole, CrewStatus, RoleQuotas};
pub use dispatch::{
    Dispatch, DispatchFilter, DispatchOutcomeKind, DispatchStatus, IncidentKind, NewDispatch,
    NewTrackingSample, Priority, TrackingSample,
};
pub use event::{DispatchEvent, EventKind, OutboxEvent, OutboxStatus};
pub use geo::{DistanceUnit, GeoPoint};
pub use vehicle::{Vehicle, VehicleCategory, VehicleFilter, VehicleStatus};
