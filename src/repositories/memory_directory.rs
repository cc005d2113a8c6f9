//! Directorio de recursos en memoria
//!
//! Cada transacción toma el mutex del almacén completo y trabaja sobre una
//! copia; `commit` reemplaza el estado y descartar la transacción lo deja
//! intacto. Serializa todas las escrituras, suficiente para pruebas y modo demo.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::models::analytics::{AvailabilitySnapshot, ResourceCounts};
use crate::models::crew::{
    AssignedCrew, AssignmentLink, CrewFilter, CrewMember, CrewRole, CrewStatus, NewCrewMember,
};
use crate::models::dispatch::{Dispatch, DispatchFilter, NewDispatch, NewTrackingSample, TrackingSample};
use crate::models::event::{DispatchEvent, OutboxEvent, OutboxStatus};
use crate::models::geo::GeoPoint;
use crate::models::vehicle::{NewVehicle, Vehicle, VehicleCategory, VehicleFilter, VehicleStatus};
use crate::utils::errors::{not_found_error, AppError, AppResult};

use super::resource_directory::{DirectoryTx, DispatchCounts, OutboxStore, ResourceDirectory};

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 500;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    vehicles: BTreeMap<i64, Vehicle>,
    crew: BTreeMap<i64, CrewMember>,
    dispatches: BTreeMap<i64, Dispatch>,
    links: Vec<AssignmentLink>,
    tracking: Vec<TrackingSample>,
    outbox: Vec<OutboxEvent>,
    last_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn is_active_dispatch(&self, dispatch_id: i64) -> bool {
        self.dispatches
            .get(&dispatch_id)
            .map_or(false, |d| d.status.is_active())
    }
}

fn count_by<'a>(keys: impl Iterator<Item = &'a str>) -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}

#[derive(Clone, Default)]
pub struct InMemoryResourceDirectory {
    state: Arc<Mutex<MemoryState>>,
    fail_commits: Arc<AtomicBool>,
}

impl InMemoryResourceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hace fallar los siguientes `commit` (simula una falla de almacenamiento)
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Copia del outbox completo, en orden de inserción
    pub async fn outbox(&self) -> Vec<OutboxEvent> {
        self.state.lock().await.outbox.clone()
    }

    /// Todos los vínculos de asignación existentes
    pub async fn all_links(&self) -> Vec<AssignmentLink> {
        self.state.lock().await.links.clone()
    }
}

#[async_trait]
impl ResourceDirectory for InMemoryResourceDirectory {
    async fn begin(&self) -> AppResult<Box<dyn DirectoryTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            fail_commit: self.fail_commits.load(Ordering::SeqCst),
        }))
    }

    async fn get_vehicle(&self, id: i64) -> AppResult<Option<Vehicle>> {
        Ok(self.state.lock().await.vehicles.get(&id).cloned())
    }

    async fn list_vehicles(&self, filter: &VehicleFilter) -> AppResult<Vec<Vehicle>> {
        let state = self.state.lock().await;
        Ok(state
            .vehicles
            .values()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect())
    }

    async fn get_crew_member(&self, id: i64) -> AppResult<Option<CrewMember>> {
        Ok(self.state.lock().await.crew.get(&id).cloned())
    }

    async fn list_crew(&self, filter: &CrewFilter) -> AppResult<Vec<CrewMember>> {
        let state = self.state.lock().await;
        Ok(state
            .crew
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }

    async fn get_dispatch(&self, id: i64) -> AppResult<Option<Dispatch>> {
        Ok(self.state.lock().await.dispatches.get(&id).cloned())
    }

    async fn list_dispatches(&self, filter: &DispatchFilter) -> AppResult<Vec<Dispatch>> {
        let state = self.state.lock().await;
        let mut dispatches: Vec<Dispatch> = state
            .dispatches
            .values()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        dispatches.sort_by(|a, b| b.requested_at.cmp(&a.requested_at).then(b.id.cmp(&a.id)));
        let limit = filter.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        dispatches.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(dispatches)
    }

    async fn dispatch_crew(&self, dispatch_id: i64) -> AppResult<Vec<AssignedCrew>> {
        let state = self.state.lock().await;
        Ok(state
            .links
            .iter()
            .filter(|l| l.dispatch_id == dispatch_id)
            .filter_map(|l| {
                state.crew.get(&l.crew_member_id).map(|member| AssignedCrew {
                    member: member.clone(),
                    role: l.role,
                    responsible: l.responsible,
                })
            })
            .collect())
    }

    async fn tracking_history(&self, dispatch_id: i64) -> AppResult<Vec<TrackingSample>> {
        let state = self.state.lock().await;
        let mut samples: Vec<TrackingSample> = state
            .tracking
            .iter()
            .filter(|s| s.dispatch_id == dispatch_id)
            .cloned()
            .collect();
        samples.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then(a.id.cmp(&b.id)));
        Ok(samples)
    }

    async fn availability_counts(&self) -> AppResult<AvailabilitySnapshot> {
        let state = self.state.lock().await;
        let vehicles = ResourceCounts {
            total: state.vehicles.len() as i64,
            by_status: count_by(state.vehicles.values().map(|v| v.status.as_str())),
            by_kind: count_by(state.vehicles.values().map(|v| v.category.as_str())),
        };
        let crew = ResourceCounts {
            total: state.crew.len() as i64,
            by_status: count_by(state.crew.values().map(|c| c.status.as_str())),
            by_kind: count_by(state.crew.values().map(|c| c.role.as_str())),
        };
        let active_dispatches = state
            .dispatches
            .values()
            .filter(|d| d.status.is_active())
            .count() as i64;
        Ok(AvailabilitySnapshot {
            vehicles,
            crew,
            active_dispatches,
        })
    }

    async fn dispatch_counts(&self, since: DateTime<Utc>) -> AppResult<DispatchCounts> {
        let state = self.state.lock().await;
        let window: Vec<&Dispatch> = state
            .dispatches
            .values()
            .filter(|d| d.requested_at >= since)
            .collect();
        Ok(DispatchCounts {
            by_status: count_by(window.iter().map(|d| d.status.as_str()))
                .into_iter()
                .collect(),
            by_priority: count_by(window.iter().map(|d| d.priority.as_str()))
                .into_iter()
                .collect(),
        })
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[async_trait]
impl OutboxStore for InMemoryResourceDirectory {
    async fn claim_due(
        &self,
        limit: i64,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> AppResult<Vec<OutboxEvent>> {
        let lease_until = now
            + chrono::Duration::from_std(lease).unwrap_or_else(|_| chrono::Duration::seconds(60));
        let limit = usize::try_from(limit.max(0)).unwrap_or(0);
        let mut state = self.state.lock().await;
        let mut claimed = Vec::new();
        for event in state.outbox.iter_mut() {
            if claimed.len() >= limit {
                break;
            }
            if event.status == OutboxStatus::Pending && event.next_attempt_at <= now {
                event.next_attempt_at = lease_until;
                claimed.push(event.clone());
            }
        }
        Ok(claimed)
    }

    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if let Some(event) = state.outbox.iter_mut().find(|e| e.id == id) {
            event.status = OutboxStatus::Delivered;
            event.attempts += 1;
            event.delivered_at = Some(at);
            event.last_error = None;
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        error: &str,
        retry_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if let Some(event) = state.outbox.iter_mut().find(|e| e.id == id) {
            event.attempts += 1;
            event.last_error = Some(error.to_string());
            match retry_at {
                Some(at) => event.next_attempt_at = at,
                None => event.status = OutboxStatus::Dead,
            }
        }
        Ok(())
    }

    async fn purge_delivered(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let len = state.outbox.len();
        state.outbox.retain(|e| {
            !(e.status == OutboxStatus::Delivered && e.delivered_at.map_or(false, |at| at < before))
        });
        Ok((len - state.outbox.len()) as u64)
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_commit: bool,
}

#[async_trait]
impl DirectoryTx for MemoryTx {
    async fn list_available_vehicles(
        &mut self,
        category: Option<VehicleCategory>,
    ) -> AppResult<Vec<Vehicle>> {
        Ok(self
            .working
            .vehicles
            .values()
            .filter(|v| v.is_available() && v.position().is_some())
            .filter(|v| category.map_or(true, |c| v.category == c))
            .cloned()
            .collect())
    }

    async fn try_lock_available_vehicle(&mut self, id: i64) -> AppResult<Option<Vehicle>> {
        Ok(self
            .working
            .vehicles
            .get(&id)
            .filter(|v| v.is_available())
            .cloned())
    }

    async fn lock_available_crew(&mut self, role: CrewRole, limit: i64) -> AppResult<Vec<CrewMember>> {
        let mut crew: Vec<CrewMember> = self
            .working
            .crew
            .values()
            .filter(|c| c.role == role && c.status == CrewStatus::Available)
            .cloned()
            .collect();
        crew.sort_by(|a, b| {
            b.experience_years
                .cmp(&a.experience_years)
                .then(a.id.cmp(&b.id))
        });
        crew.truncate(usize::try_from(limit.max(0)).unwrap_or(0));
        Ok(crew)
    }

    async fn lock_vehicle(&mut self, id: i64) -> AppResult<Option<Vehicle>> {
        Ok(self.working.vehicles.get(&id).cloned())
    }

    async fn lock_crew_member(&mut self, id: i64) -> AppResult<Option<CrewMember>> {
        Ok(self.working.crew.get(&id).cloned())
    }

    async fn lock_dispatch(&mut self, id: i64) -> AppResult<Option<Dispatch>> {
        Ok(self.working.dispatches.get(&id).cloned())
    }

    async fn insert_vehicle(&mut self, vehicle: &NewVehicle) -> AppResult<Vehicle> {
        if self.working.vehicles.values().any(|v| v.plate == vehicle.plate) {
            return Err(AppError::Conflict(format!(
                "plate '{}' already registered",
                vehicle.plate
            )));
        }
        let now = Utc::now();
        let id = self.working.next_id();
        let created = Vehicle {
            id,
            plate: vehicle.plate.clone(),
            model: vehicle.model.clone(),
            category: vehicle.category,
            status: VehicleStatus::Available,
            latitude: vehicle.position.map(|p| p.latitude),
            longitude: vehicle.position.map(|p| p.longitude),
            position_updated_at: vehicle.position.map(|_| now),
            created_at: now,
        };
        self.working.vehicles.insert(id, created.clone());
        Ok(created)
    }

    async fn insert_crew_member(&mut self, member: &NewCrewMember) -> AppResult<CrewMember> {
        if self
            .working
            .crew
            .values()
            .any(|c| c.national_id == member.national_id)
        {
            return Err(AppError::Conflict(format!(
                "national id '{}' already registered",
                member.national_id
            )));
        }
        let id = self.working.next_id();
        let created = CrewMember {
            id,
            first_name: member.first_name.clone(),
            last_name: member.last_name.clone(),
            national_id: member.national_id.clone(),
            role: member.role,
            specialty: member.specialty.clone(),
            experience_years: member.experience_years,
            status: CrewStatus::Available,
            phone: member.phone.clone(),
            email: member.email.clone(),
            created_at: Utc::now(),
        };
        self.working.crew.insert(id, created.clone());
        Ok(created)
    }

    async fn update_vehicle_status(&mut self, id: i64, status: VehicleStatus) -> AppResult<()> {
        let vehicle = self
            .working
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| not_found_error("Vehicle", id))?;
        vehicle.status = status;
        Ok(())
    }

    async fn update_vehicle_position(
        &mut self,
        id: i64,
        position: GeoPoint,
        at: DateTime<Utc>,
    ) -> AppResult<Vehicle> {
        let vehicle = self
            .working
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| not_found_error("Vehicle", id))?;
        vehicle.latitude = Some(position.latitude);
        vehicle.longitude = Some(position.longitude);
        vehicle.position_updated_at = Some(at);
        Ok(vehicle.clone())
    }

    async fn update_crew_status(&mut self, id: i64, status: CrewStatus) -> AppResult<()> {
        let member = self
            .working
            .crew
            .get_mut(&id)
            .ok_or_else(|| not_found_error("CrewMember", id))?;
        member.status = status;
        Ok(())
    }

    async fn create_dispatch(&mut self, dispatch: &NewDispatch) -> AppResult<Dispatch> {
        let id = self.working.next_id();
        let created = Dispatch {
            id,
            request_ref: dispatch.request_ref,
            vehicle_id: dispatch.vehicle_id,
            origin_lat: dispatch.origin.latitude,
            origin_lng: dispatch.origin.longitude,
            origin_address: dispatch.origin_address.clone(),
            destination_lat: dispatch.destination.map(|p| p.latitude),
            destination_lng: dispatch.destination.map(|p| p.longitude),
            destination_address: dispatch.destination_address.clone(),
            distance_km: dispatch.distance_km,
            estimated_minutes: dispatch.estimated_minutes,
            actual_minutes: None,
            status: dispatch.status,
            priority: dispatch.priority,
            incident: dispatch.incident,
            notes: dispatch.notes.clone(),
            supplementary: dispatch.supplementary.clone(),
            requested_at: dispatch.requested_at,
            assigned_at: dispatch.assigned_at,
            arrived_at: None,
            concluded_at: None,
            updated_at: dispatch.requested_at,
        };
        self.working.dispatches.insert(id, created.clone());
        Ok(created)
    }

    async fn save_dispatch(&mut self, dispatch: &Dispatch) -> AppResult<()> {
        match self.working.dispatches.get_mut(&dispatch.id) {
            Some(stored) => {
                *stored = dispatch.clone();
                Ok(())
            }
            None => Err(not_found_error("Dispatch", dispatch.id)),
        }
    }

    async fn update_estimated_minutes(&mut self, id: i64, minutes: i32) -> AppResult<()> {
        if let Some(stored) = self.working.dispatches.get_mut(&id) {
            stored.estimated_minutes = Some(minutes);
        }
        Ok(())
    }

    async fn active_dispatch_for_vehicle(&mut self, vehicle_id: i64) -> AppResult<Option<i64>> {
        Ok(self
            .working
            .dispatches
            .values()
            .find(|d| d.vehicle_id == Some(vehicle_id) && d.status.is_active())
            .map(|d| d.id))
    }

    async fn create_assignment_link(
        &mut self,
        dispatch_id: i64,
        crew_member_id: i64,
        role: CrewRole,
        responsible: bool,
    ) -> AppResult<AssignmentLink> {
        if self
            .working
            .links
            .iter()
            .any(|l| l.dispatch_id == dispatch_id && l.crew_member_id == crew_member_id)
        {
            return Err(AppError::Conflict(format!(
                "crew member {} is already assigned to dispatch {}",
                crew_member_id, dispatch_id
            )));
        }
        if !self.working.dispatches.contains_key(&dispatch_id) {
            return Err(not_found_error("Dispatch", dispatch_id));
        }
        if !self.working.crew.contains_key(&crew_member_id) {
            return Err(not_found_error("CrewMember", crew_member_id));
        }
        let link = AssignmentLink {
            id: self.working.next_id(),
            dispatch_id,
            crew_member_id,
            role,
            responsible,
            created_at: Utc::now(),
        };
        self.working.links.push(link.clone());
        Ok(link)
    }

    async fn assignment_links(&mut self, dispatch_id: i64) -> AppResult<Vec<AssignmentLink>> {
        Ok(self
            .working
            .links
            .iter()
            .filter(|l| l.dispatch_id == dispatch_id)
            .cloned()
            .collect())
    }

    async fn active_links_for_crew(&mut self, crew_member_id: i64) -> AppResult<Vec<AssignmentLink>> {
        Ok(self
            .working
            .links
            .iter()
            .filter(|l| {
                l.crew_member_id == crew_member_id && self.working.is_active_dispatch(l.dispatch_id)
            })
            .cloned()
            .collect())
    }

    async fn delete_assignment_link(&mut self, dispatch_id: i64, crew_member_id: i64) -> AppResult<bool> {
        let before = self.working.links.len();
        self.working
            .links
            .retain(|l| !(l.dispatch_id == dispatch_id && l.crew_member_id == crew_member_id));
        Ok(self.working.links.len() < before)
    }

    async fn delete_assignment_links(&mut self, dispatch_id: i64) -> AppResult<u64> {
        let before = self.working.links.len();
        self.working.links.retain(|l| l.dispatch_id != dispatch_id);
        Ok((before - self.working.links.len()) as u64)
    }

    async fn append_tracking_sample(
        &mut self,
        dispatch_id: i64,
        sample: &NewTrackingSample,
    ) -> AppResult<TrackingSample> {
        let stored = TrackingSample {
            id: self.working.next_id(),
            dispatch_id,
            latitude: sample.position.latitude,
            longitude: sample.position.longitude,
            speed_kmh: sample.speed_kmh,
            altitude_m: sample.altitude_m,
            accuracy_m: sample.accuracy_m,
            recorded_at: sample.recorded_at,
        };
        self.working.tracking.push(stored.clone());
        Ok(stored)
    }

    async fn enqueue_event(&mut self, event: &DispatchEvent) -> AppResult<()> {
        self.working.outbox.push(OutboxEvent::from_event(event));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        if self.fail_commit {
            return Err(AppError::OperationFailed("simulated commit failure".to_string()));
        }
        let MemoryTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
