//! Frontera de persistencia del motor de despacho
//!
//! `ResourceDirectory` expone las lecturas sin bloqueo y abre transacciones
//! (`DirectoryTx`). Toda mutación de varios pasos ocurre dentro de una
//! `DirectoryTx`; si se descarta sin `commit`, nada de lo hecho persiste.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::models::analytics::AvailabilitySnapshot;
use crate::models::crew::{
    AssignedCrew, AssignmentLink, CrewFilter, CrewMember, CrewRole, CrewStatus, NewCrewMember,
};
use crate::models::dispatch::{Dispatch, DispatchFilter, NewDispatch, NewTrackingSample, TrackingSample};
use crate::models::event::{DispatchEvent, OutboxEvent};
use crate::models::geo::GeoPoint;
use crate::models::vehicle::{NewVehicle, Vehicle, VehicleCategory, VehicleFilter, VehicleStatus};
use crate::utils::errors::AppResult;

/// Conteos crudos de despachos en una ventana
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchCounts {
    pub by_status: Vec<(String, i64)>,
    pub by_priority: Vec<(String, i64)>,
}

#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    /// Abrir una transacción
    async fn begin(&self) -> AppResult<Box<dyn DirectoryTx>>;

    async fn get_vehicle(&self, id: i64) -> AppResult<Option<Vehicle>>;
    async fn list_vehicles(&self, filter: &VehicleFilter) -> AppResult<Vec<Vehicle>>;
    async fn get_crew_member(&self, id: i64) -> AppResult<Option<CrewMember>>;
    async fn list_crew(&self, filter: &CrewFilter) -> AppResult<Vec<CrewMember>>;
    async fn get_dispatch(&self, id: i64) -> AppResult<Option<Dispatch>>;
    /// Más recientes primero
    async fn list_dispatches(&self, filter: &DispatchFilter) -> AppResult<Vec<Dispatch>>;
    async fn dispatch_crew(&self, dispatch_id: i64) -> AppResult<Vec<AssignedCrew>>;
    async fn tracking_history(&self, dispatch_id: i64) -> AppResult<Vec<TrackingSample>>;
    async fn availability_counts(&self) -> AppResult<AvailabilitySnapshot>;
    async fn dispatch_counts(&self, since: DateTime<Utc>) -> AppResult<DispatchCounts>;
    async fn ping(&self) -> bool;
}

/// Transacción sobre el almacén de recursos
#[async_trait]
pub trait DirectoryTx: Send {
    /// Vehículos `available` con posición conocida; sin bloqueo de filas
    async fn list_available_vehicles(
        &mut self,
        category: Option<VehicleCategory>,
    ) -> AppResult<Vec<Vehicle>>;

    /// Bloquea el vehículo solo si sigue `available` y nadie más lo tiene
    /// bloqueado; `None` si otro lo reservó primero
    async fn try_lock_available_vehicle(&mut self, id: i64) -> AppResult<Option<Vehicle>>;

    /// Hasta `limit` miembros `available` con ese rol, bloqueados
    async fn lock_available_crew(&mut self, role: CrewRole, limit: i64) -> AppResult<Vec<CrewMember>>;

    async fn lock_vehicle(&mut self, id: i64) -> AppResult<Option<Vehicle>>;
    async fn lock_crew_member(&mut self, id: i64) -> AppResult<Option<CrewMember>>;
    async fn lock_dispatch(&mut self, id: i64) -> AppResult<Option<Dispatch>>;

    async fn insert_vehicle(&mut self, vehicle: &NewVehicle) -> AppResult<Vehicle>;
    async fn insert_crew_member(&mut self, member: &NewCrewMember) -> AppResult<CrewMember>;

    async fn update_vehicle_status(&mut self, id: i64, status: VehicleStatus) -> AppResult<()>;
    async fn update_vehicle_position(
        &mut self,
        id: i64,
        position: GeoPoint,
        at: DateTime<Utc>,
    ) -> AppResult<Vehicle>;
    async fn update_crew_status(&mut self, id: i64, status: CrewStatus) -> AppResult<()>;

    async fn create_dispatch(&mut self, dispatch: &NewDispatch) -> AppResult<Dispatch>;
    /// Persiste estado, tiempos, duraciones y datos suplementarios
    async fn save_dispatch(&mut self, dispatch: &Dispatch) -> AppResult<()>;
    async fn update_estimated_minutes(&mut self, id: i64, minutes: i32) -> AppResult<()>;
    /// Despacho activo que usa el vehículo, si hay
    async fn active_dispatch_for_vehicle(&mut self, vehicle_id: i64) -> AppResult<Option<i64>>;

    /// `Conflict` si el par (despacho, personal) ya existe
    async fn create_assignment_link(
        &mut self,
        dispatch_id: i64,
        crew_member_id: i64,
        role: CrewRole,
        responsible: bool,
    ) -> AppResult<AssignmentLink>;
    async fn assignment_links(&mut self, dispatch_id: i64) -> AppResult<Vec<AssignmentLink>>;
    /// Vínculos del miembro con despachos activos
    async fn active_links_for_crew(&mut self, crew_member_id: i64) -> AppResult<Vec<AssignmentLink>>;
    async fn delete_assignment_link(&mut self, dispatch_id: i64, crew_member_id: i64) -> AppResult<bool>;
    async fn delete_assignment_links(&mut self, dispatch_id: i64) -> AppResult<u64>;

    async fn append_tracking_sample(
        &mut self,
        dispatch_id: i64,
        sample: &NewTrackingSample,
    ) -> AppResult<TrackingSample>;

    /// Encolar un evento en el outbox de esta misma transacción
    async fn enqueue_event(&mut self, event: &DispatchEvent) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Lado de entrega del outbox, usado solo por el relay
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Reclama hasta `limit` eventos pendientes vencidos y los aparta durante
    /// `lease` para que otro relay no los tome
    async fn claim_due(
        &self,
        limit: i64,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> AppResult<Vec<OutboxEvent>>;
    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;
    /// Incrementa `attempts`; con `retry_at = None` el evento queda `dead`
    async fn mark_failed(
        &self,
        id: Uuid,
        error: &str,
        retry_at: Option<DateTime<Utc>>,
    ) -> AppResult<()>;
    /// Borra los eventos entregados antes de `before`; devuelve cuántos
    async fn purge_delivered(&self, before: DateTime<Utc>) -> AppResult<u64>;
}
