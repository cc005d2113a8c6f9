//! Operaciones de flota y personal fuera del flujo de asignación
//!
//! Alta de recursos, posición de vehículos, cambios de estado del operador
//! y vinculación manual de personal. Ninguna operación puede dejar un
//! despacho activo sin vehículo `in_service` o sin personal.

use std::sync::Arc;
use tracing::info;

use crate::models::crew::{AssignmentLink, CrewFilter, CrewMember, CrewRole, CrewStatus, NewCrewMember};
use crate::models::event::DispatchEvent;
use crate::models::geo::GeoPoint;
use crate::models::vehicle::{NewVehicle, Vehicle, VehicleFilter, VehicleStatus};
use crate::repositories::ResourceDirectory;
use crate::utils::clock::Clock;
use crate::utils::errors::{invalid_field, not_found_error, AppError, AppResult};
use crate::utils::validation::{ensure_coordinates, validate_license_plate};

pub struct FleetService {
    directory: Arc<dyn ResourceDirectory>,
    clock: Arc<dyn Clock>,
}

impl FleetService {
    pub fn new(directory: Arc<dyn ResourceDirectory>, clock: Arc<dyn Clock>) -> Self {
        Self { directory, clock }
    }

    pub async fn register_vehicle(&self, vehicle: NewVehicle) -> AppResult<Vehicle> {
        if validate_license_plate(&vehicle.plate).is_err() {
            return Err(invalid_field("plate", format!("invalid plate '{}'", vehicle.plate)));
        }
        if let Some(position) = vehicle.position {
            ensure_coordinates("position", position.latitude, position.longitude)?;
        }
        let mut tx = self.directory.begin().await?;
        let created = tx.insert_vehicle(&vehicle).await?;
        tx.commit().await?;
        info!(vehicle_id = created.id, plate = %created.plate, "🚑 Vehículo registrado");
        Ok(created)
    }

    pub async fn register_crew_member(&self, member: NewCrewMember) -> AppResult<CrewMember> {
        if member.first_name.trim().is_empty() || member.last_name.trim().is_empty() {
            return Err(invalid_field("name", "first and last name are required"));
        }
        if member.experience_years < 0 {
            return Err(invalid_field("experience_years", "must be non-negative"));
        }
        let mut tx = self.directory.begin().await?;
        let created = tx.insert_crew_member(&member).await?;
        tx.commit().await?;
        info!(crew_member_id = created.id, role = %created.role, "👤 Personal registrado");
        Ok(created)
    }

    pub async fn get_vehicle(&self, id: i64) -> AppResult<Vehicle> {
        self.directory
            .get_vehicle(id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", id))
    }

    pub async fn list_vehicles(&self, filter: &VehicleFilter) -> AppResult<Vec<Vehicle>> {
        self.directory.list_vehicles(filter).await
    }

    pub async fn list_crew(&self, filter: &CrewFilter) -> AppResult<Vec<CrewMember>> {
        self.directory.list_crew(filter).await
    }

    /// Nueva posición GPS del vehículo; encola `vehicle.location_updated`
    pub async fn update_vehicle_location(&self, vehicle_id: i64, position: GeoPoint) -> AppResult<Vehicle> {
        ensure_coordinates("position", position.latitude, position.longitude)?;
        let now = self.clock.now();

        let mut tx = self.directory.begin().await?;
        if tx.lock_vehicle(vehicle_id).await?.is_none() {
            return Err(not_found_error("Vehicle", vehicle_id));
        }
        let vehicle = tx.update_vehicle_position(vehicle_id, position, now).await?;
        tx.enqueue_event(&DispatchEvent::vehicle_location_updated(&vehicle, now))
            .await?;
        tx.commit().await?;
        Ok(vehicle)
    }

    /// Cambio de estado manual. `in_service` solo lo asigna el motor, y un
    /// vehículo con despacho activo no puede salir de servicio.
    pub async fn set_vehicle_status(&self, vehicle_id: i64, status: VehicleStatus) -> AppResult<Vehicle> {
        if status == VehicleStatus::InService {
            return Err(AppError::Conflict(
                "in_service is set only by dispatch assignment".to_string(),
            ));
        }

        let mut tx = self.directory.begin().await?;
        let mut vehicle = tx
            .lock_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", vehicle_id))?;
        if let Some(dispatch_id) = tx.active_dispatch_for_vehicle(vehicle_id).await? {
            return Err(AppError::Conflict(format!(
                "vehicle {} is serving active dispatch {}",
                vehicle_id, dispatch_id
            )));
        }
        if vehicle.status == status {
            return Ok(vehicle);
        }

        tx.update_vehicle_status(vehicle_id, status).await?;
        tx.commit().await?;
        info!(vehicle_id, from = %vehicle.status, to = %status, "🔧 Estado de vehículo actualizado");
        vehicle.status = status;
        Ok(vehicle)
    }

    /// Cambio de estado manual del personal; encola `crew.status_changed`
    pub async fn set_crew_status(&self, crew_member_id: i64, status: CrewStatus) -> AppResult<CrewMember> {
        if status == CrewStatus::InService {
            return Err(AppError::Conflict(
                "in_service is set only by crew assignment".to_string(),
            ));
        }

        let mut tx = self.directory.begin().await?;
        let mut member = tx
            .lock_crew_member(crew_member_id)
            .await?
            .ok_or_else(|| not_found_error("CrewMember", crew_member_id))?;
        let active = tx.active_links_for_crew(crew_member_id).await?;
        if let Some(link) = active.first() {
            return Err(AppError::Conflict(format!(
                "crew member {} is assigned to active dispatch {}",
                crew_member_id, link.dispatch_id
            )));
        }
        if member.status == status {
            return Ok(member);
        }

        let previous = member.status;
        tx.update_crew_status(crew_member_id, status).await?;
        member.status = status;
        tx.enqueue_event(&DispatchEvent::crew_status_changed(
            &member,
            previous,
            status,
            self.clock.now(),
        ))
        .await?;
        tx.commit().await?;
        Ok(member)
    }

    /// Vincula personal disponible a un despacho activo
    pub async fn attach_crew(
        &self,
        dispatch_id: i64,
        crew_member_id: i64,
        role: Option<CrewRole>,
        responsible: bool,
    ) -> AppResult<AssignmentLink> {
        let mut tx = self.directory.begin().await?;
        let dispatch = tx
            .lock_dispatch(dispatch_id)
            .await?
            .ok_or_else(|| not_found_error("Dispatch", dispatch_id))?;
        if !dispatch.status.is_active() {
            return Err(AppError::Conflict(format!(
                "dispatch {} is {} and cannot take crew",
                dispatch_id, dispatch.status
            )));
        }
        let member = tx
            .lock_crew_member(crew_member_id)
            .await?
            .ok_or_else(|| not_found_error("CrewMember", crew_member_id))?;

        let links = tx.assignment_links(dispatch_id).await?;
        if links.iter().any(|l| l.crew_member_id == crew_member_id) {
            return Err(AppError::Conflict(format!(
                "crew member {} is already assigned to dispatch {}",
                crew_member_id, dispatch_id
            )));
        }
        if member.status != CrewStatus::Available {
            return Err(AppError::Conflict(format!(
                "crew member {} is {}",
                crew_member_id, member.status
            )));
        }
        if responsible && links.iter().any(|l| l.responsible) {
            return Err(AppError::Conflict(format!(
                "dispatch {} already has a responsible crew member",
                dispatch_id
            )));
        }

        let link = tx
            .create_assignment_link(
                dispatch_id,
                crew_member_id,
                role.unwrap_or(member.role),
                responsible,
            )
            .await?;
        tx.update_crew_status(crew_member_id, CrewStatus::InService)
            .await?;
        tx.commit().await?;
        info!(dispatch_id, crew_member_id, "👥 Personal vinculado");
        Ok(link)
    }

    /// Desvincula personal; un despacho activo conserva al menos una persona
    pub async fn detach_crew(&self, dispatch_id: i64, crew_member_id: i64) -> AppResult<()> {
        let mut tx = self.directory.begin().await?;
        let dispatch = tx
            .lock_dispatch(dispatch_id)
            .await?
            .ok_or_else(|| not_found_error("Dispatch", dispatch_id))?;
        let links = tx.assignment_links(dispatch_id).await?;
        if !links.iter().any(|l| l.crew_member_id == crew_member_id) {
            return Err(AppError::NotFound(format!(
                "crew member {} is not assigned to dispatch {}",
                crew_member_id, dispatch_id
            )));
        }
        if dispatch.status.is_active() && links.len() == 1 {
            return Err(AppError::Conflict(format!(
                "dispatch {} cannot be left without crew",
                dispatch_id
            )));
        }

        tx.delete_assignment_link(dispatch_id, crew_member_id).await?;
        tx.update_crew_status(crew_member_id, CrewStatus::Available)
            .await?;
        tx.commit().await?;
        info!(dispatch_id, crew_member_id, "👥 Personal desvinculado");
        Ok(())
    }
}
