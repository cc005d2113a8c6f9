//! Implementación PostgreSQL del directorio de recursos
//!
//! La selección de candidatos usa `FOR UPDATE SKIP LOCKED`: dos reservas
//! concurrentes nunca bloquean la misma fila, y la que llega segunda pasa
//! al siguiente candidato en lugar de esperar.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::models::analytics::{AvailabilitySnapshot, ResourceCounts};
use crate::models::crew::{
    AssignedCrew, AssignmentLink, CrewFilter, CrewMember, CrewRole, CrewStatus, NewCrewMember,
};
use crate::models::dispatch::{Dispatch, DispatchFilter, NewDispatch, NewTrackingSample, TrackingSample};
use crate::models::event::{DispatchEvent, OutboxEvent};
use crate::models::geo::GeoPoint;
use crate::models::vehicle::{NewVehicle, Vehicle, VehicleCategory, VehicleFilter, VehicleStatus};
use crate::utils::errors::{not_found_error, AppError, AppResult};

use super::resource_directory::{DirectoryTx, DispatchCounts, OutboxStore, ResourceDirectory};

const ACTIVE_STATUSES: &str = "('assigned', 'en_route', 'on_scene', 'transporting')";
const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 500;

#[derive(FromRow)]
struct AssignedCrewRow {
    #[sqlx(flatten)]
    member: CrewMember,
    link_role: CrewRole,
    responsible: bool,
}

fn conflict_on_unique(e: sqlx::Error, message: String) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(message),
        _ => AppError::Database(e),
    }
}

async fn group_counts(pool: &PgPool, sql: &str) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64)>(sql).fetch_all(pool).await
}

fn resource_counts(by_status: Vec<(String, i64)>, by_kind: Vec<(String, i64)>) -> ResourceCounts {
    ResourceCounts {
        total: by_status.iter().map(|(_, n)| n).sum(),
        by_status: by_status.into_iter().collect(),
        by_kind: by_kind.into_iter().collect(),
    }
}

#[derive(Clone)]
pub struct PgResourceDirectory {
    pool: PgPool,
}

impl PgResourceDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ResourceDirectory for PgResourceDirectory {
    async fn begin(&self) -> AppResult<Box<dyn DirectoryTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgDirectoryTx { tx }))
    }

    async fn get_vehicle(&self, id: i64) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(vehicle)
    }

    async fn list_vehicles(&self, filter: &VehicleFilter) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT * FROM vehicles
            WHERE ($1::vehicle_status IS NULL OR status = $1)
              AND ($2::vehicle_category IS NULL OR category = $2)
            ORDER BY id
            "#,
        )
        .bind(filter.status)
        .bind(filter.category)
        .fetch_all(&self.pool)
        .await?;
        Ok(vehicles)
    }

    async fn get_crew_member(&self, id: i64) -> AppResult<Option<CrewMember>> {
        let member = sqlx::query_as::<_, CrewMember>("SELECT * FROM crew_members WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(member)
    }

    async fn list_crew(&self, filter: &CrewFilter) -> AppResult<Vec<CrewMember>> {
        let crew = sqlx::query_as::<_, CrewMember>(
            r#"
            SELECT * FROM crew_members
            WHERE ($1::crew_status IS NULL OR status = $1)
              AND ($2::crew_role IS NULL OR role = $2)
            ORDER BY id
            "#,
        )
        .bind(filter.status)
        .bind(filter.role)
        .fetch_all(&self.pool)
        .await?;
        Ok(crew)
    }

    async fn get_dispatch(&self, id: i64) -> AppResult<Option<Dispatch>> {
        let dispatch = sqlx::query_as::<_, Dispatch>("SELECT * FROM dispatches WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(dispatch)
    }

    async fn list_dispatches(&self, filter: &DispatchFilter) -> AppResult<Vec<Dispatch>> {
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        let sql = format!(
            r#"
            SELECT * FROM dispatches
            WHERE ($1::dispatch_status IS NULL OR status = $1)
              AND ($2::dispatch_priority IS NULL OR priority = $2)
              AND (NOT $3 OR status IN {active})
              AND ($4::timestamptz IS NULL OR requested_at >= $4)
            ORDER BY requested_at DESC, id DESC
            LIMIT $5
            "#,
            active = ACTIVE_STATUSES
        );
        let dispatches = sqlx::query_as::<_, Dispatch>(&sql)
            .bind(filter.status)
            .bind(filter.priority)
            .bind(filter.active_only)
            .bind(filter.requested_since)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(dispatches)
    }

    async fn dispatch_crew(&self, dispatch_id: i64) -> AppResult<Vec<AssignedCrew>> {
        let rows = sqlx::query_as::<_, AssignedCrewRow>(
            r#"
            SELECT c.*, l.role AS link_role, l.responsible
            FROM assignment_links l
            JOIN crew_members c ON c.id = l.crew_member_id
            WHERE l.dispatch_id = $1
            ORDER BY l.id
            "#,
        )
        .bind(dispatch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AssignedCrew {
                member: row.member,
                role: row.link_role,
                responsible: row.responsible,
            })
            .collect())
    }

    async fn tracking_history(&self, dispatch_id: i64) -> AppResult<Vec<TrackingSample>> {
        let samples = sqlx::query_as::<_, TrackingSample>(
            "SELECT * FROM tracking_samples WHERE dispatch_id = $1 ORDER BY recorded_at, id",
        )
        .bind(dispatch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(samples)
    }

    async fn availability_counts(&self) -> AppResult<AvailabilitySnapshot> {
        let vehicles_by_status = group_counts(
            &self.pool,
            "SELECT status::text, COUNT(*) FROM vehicles GROUP BY status",
        )
        .await?;
        let vehicles_by_category = group_counts(
            &self.pool,
            "SELECT category::text, COUNT(*) FROM vehicles GROUP BY category",
        )
        .await?;
        let crew_by_status = group_counts(
            &self.pool,
            "SELECT status::text, COUNT(*) FROM crew_members GROUP BY status",
        )
        .await?;
        let crew_by_role = group_counts(
            &self.pool,
            "SELECT role::text, COUNT(*) FROM crew_members GROUP BY role",
        )
        .await?;
        let (active_dispatches,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM dispatches WHERE status IN {}",
            ACTIVE_STATUSES
        ))
        .fetch_one(&self.pool)
        .await?;

        Ok(AvailabilitySnapshot {
            vehicles: resource_counts(vehicles_by_status, vehicles_by_category),
            crew: resource_counts(crew_by_status, crew_by_role),
            active_dispatches,
        })
    }

    async fn dispatch_counts(&self, since: DateTime<Utc>) -> AppResult<DispatchCounts> {
        let by_status = sqlx::query_as::<_, (String, i64)>(
            "SELECT status::text, COUNT(*) FROM dispatches WHERE requested_at >= $1 GROUP BY status",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        let by_priority = sqlx::query_as::<_, (String, i64)>(
            "SELECT priority::text, COUNT(*) FROM dispatches WHERE requested_at >= $1 GROUP BY priority",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(DispatchCounts {
            by_status,
            by_priority,
        })
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[async_trait]
impl OutboxStore for PgResourceDirectory {
    async fn claim_due(
        &self,
        limit: i64,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> AppResult<Vec<OutboxEvent>> {
        let lease_until = now
            + chrono::Duration::from_std(lease).unwrap_or_else(|_| chrono::Duration::seconds(60));

        let mut events = sqlx::query_as::<_, OutboxEvent>(
            r#"
            WITH due AS (
                SELECT id
                FROM outbox_events
                WHERE status = 'pending'
                  AND next_attempt_at <= $1
                ORDER BY created_at
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            UPDATE outbox_events
            SET next_attempt_at = $3
            WHERE id IN (SELECT id FROM due)
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(limit)
        .bind(lease_until)
        .fetch_all(&self.pool)
        .await?;

        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }

    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE outbox_events
            SET status = 'delivered',
                attempts = attempts + 1,
                delivered_at = $2,
                last_error = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        error: &str,
        retry_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE outbox_events
            SET attempts = attempts + 1,
                last_error = $2,
                status = CASE WHEN $3::timestamptz IS NULL
                              THEN 'dead'::outbox_status
                              ELSE 'pending'::outbox_status END,
                next_attempt_at = COALESCE($3::timestamptz, next_attempt_at)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(retry_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn purge_delivered(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM outbox_events
            WHERE status = 'delivered' AND delivered_at < $1
            "#,
        )
        .bind(before)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() > 0 {
            debug!(purged = result.rows_affected(), "Outbox entregado depurado");
        }
        Ok(result.rows_affected())
    }
}

pub struct PgDirectoryTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl DirectoryTx for PgDirectoryTx {
    async fn list_available_vehicles(
        &mut self,
        category: Option<VehicleCategory>,
    ) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT * FROM vehicles
            WHERE status = 'available'
              AND latitude IS NOT NULL
              AND longitude IS NOT NULL
              AND ($1::vehicle_category IS NULL OR category = $1)
            ORDER BY id
            "#,
        )
        .bind(category)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(vehicles)
    }

    async fn try_lock_available_vehicle(&mut self, id: i64) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT * FROM vehicles
            WHERE id = $1 AND status = 'available'
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(vehicle)
    }

    async fn lock_available_crew(&mut self, role: CrewRole, limit: i64) -> AppResult<Vec<CrewMember>> {
        let crew = sqlx::query_as::<_, CrewMember>(
            r#"
            SELECT * FROM crew_members
            WHERE role = $1 AND status = 'available'
            ORDER BY experience_years DESC, id
            LIMIT $2
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(role)
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(crew)
    }

    async fn lock_vehicle(&mut self, id: i64) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(vehicle)
    }

    async fn lock_crew_member(&mut self, id: i64) -> AppResult<Option<CrewMember>> {
        let member =
            sqlx::query_as::<_, CrewMember>("SELECT * FROM crew_members WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(member)
    }

    async fn lock_dispatch(&mut self, id: i64) -> AppResult<Option<Dispatch>> {
        let dispatch =
            sqlx::query_as::<_, Dispatch>("SELECT * FROM dispatches WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(dispatch)
    }

    async fn insert_vehicle(&mut self, vehicle: &NewVehicle) -> AppResult<Vehicle> {
        let position = vehicle.position;
        sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (plate, model, category, latitude, longitude, position_updated_at)
            VALUES ($1, $2, $3, $4, $5, CASE WHEN $4::double precision IS NULL THEN NULL ELSE NOW() END)
            RETURNING *
            "#,
        )
        .bind(&vehicle.plate)
        .bind(&vehicle.model)
        .bind(vehicle.category)
        .bind(position.map(|p| p.latitude))
        .bind(position.map(|p| p.longitude))
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| conflict_on_unique(e, format!("plate '{}' already registered", vehicle.plate)))
    }

    async fn insert_crew_member(&mut self, member: &NewCrewMember) -> AppResult<CrewMember> {
        sqlx::query_as::<_, CrewMember>(
            r#"
            INSERT INTO crew_members
                (first_name, last_name, national_id, role, specialty, experience_years, phone, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.national_id)
        .bind(member.role)
        .bind(&member.specialty)
        .bind(member.experience_years)
        .bind(&member.phone)
        .bind(&member.email)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            conflict_on_unique(
                e,
                format!("national id '{}' already registered", member.national_id),
            )
        })
    }

    async fn update_vehicle_status(&mut self, id: i64, status: VehicleStatus) -> AppResult<()> {
        let result = sqlx::query("UPDATE vehicles SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found_error("Vehicle", id));
        }
        Ok(())
    }

    async fn update_vehicle_position(
        &mut self,
        id: i64,
        position: GeoPoint,
        at: DateTime<Utc>,
    ) -> AppResult<Vehicle> {
        sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET latitude = $2, longitude = $3, position_updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(position.latitude)
        .bind(position.longitude)
        .bind(at)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| not_found_error("Vehicle", id))
    }

    async fn update_crew_status(&mut self, id: i64, status: CrewStatus) -> AppResult<()> {
        let result = sqlx::query("UPDATE crew_members SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found_error("CrewMember", id));
        }
        Ok(())
    }

    async fn create_dispatch(&mut self, dispatch: &NewDispatch) -> AppResult<Dispatch> {
        let destination = dispatch.destination;
        let created = sqlx::query_as::<_, Dispatch>(
            r#"
            INSERT INTO dispatches (
                request_ref, vehicle_id, origin_lat, origin_lng, origin_address,
                destination_lat, destination_lng, destination_address,
                distance_km, estimated_minutes, status, priority, incident, notes,
                supplementary, requested_at, assigned_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $16)
            RETURNING *
            "#,
        )
        .bind(dispatch.request_ref)
        .bind(dispatch.vehicle_id)
        .bind(dispatch.origin.latitude)
        .bind(dispatch.origin.longitude)
        .bind(&dispatch.origin_address)
        .bind(destination.map(|p| p.latitude))
        .bind(destination.map(|p| p.longitude))
        .bind(&dispatch.destination_address)
        .bind(dispatch.distance_km)
        .bind(dispatch.estimated_minutes)
        .bind(dispatch.status)
        .bind(dispatch.priority)
        .bind(dispatch.incident)
        .bind(&dispatch.notes)
        .bind(&dispatch.supplementary)
        .bind(dispatch.requested_at)
        .bind(dispatch.assigned_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(created)
    }

    async fn save_dispatch(&mut self, dispatch: &Dispatch) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE dispatches
            SET vehicle_id = $2,
                destination_lat = $3,
                destination_lng = $4,
                destination_address = $5,
                distance_km = $6,
                estimated_minutes = $7,
                actual_minutes = $8,
                status = $9,
                notes = $10,
                supplementary = $11,
                assigned_at = $12,
                arrived_at = $13,
                concluded_at = $14,
                updated_at = $15
            WHERE id = $1
            "#,
        )
        .bind(dispatch.id)
        .bind(dispatch.vehicle_id)
        .bind(dispatch.destination_lat)
        .bind(dispatch.destination_lng)
        .bind(&dispatch.destination_address)
        .bind(dispatch.distance_km)
        .bind(dispatch.estimated_minutes)
        .bind(dispatch.actual_minutes)
        .bind(dispatch.status)
        .bind(&dispatch.notes)
        .bind(&dispatch.supplementary)
        .bind(dispatch.assigned_at)
        .bind(dispatch.arrived_at)
        .bind(dispatch.concluded_at)
        .bind(dispatch.updated_at)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(not_found_error("Dispatch", dispatch.id));
        }
        Ok(())
    }

    async fn update_estimated_minutes(&mut self, id: i64, minutes: i32) -> AppResult<()> {
        sqlx::query("UPDATE dispatches SET estimated_minutes = $2 WHERE id = $1")
            .bind(id)
            .bind(minutes)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn active_dispatch_for_vehicle(&mut self, vehicle_id: i64) -> AppResult<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(&format!(
            "SELECT id FROM dispatches WHERE vehicle_id = $1 AND status IN {} LIMIT 1",
            ACTIVE_STATUSES
        ))
        .bind(vehicle_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(|(id,)| id))
    }

    async fn create_assignment_link(
        &mut self,
        dispatch_id: i64,
        crew_member_id: i64,
        role: CrewRole,
        responsible: bool,
    ) -> AppResult<AssignmentLink> {
        sqlx::query_as::<_, AssignmentLink>(
            r#"
            INSERT INTO assignment_links (dispatch_id, crew_member_id, role, responsible)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(dispatch_id)
        .bind(crew_member_id)
        .bind(role)
        .bind(responsible)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            conflict_on_unique(
                e,
                format!(
                    "crew member {} is already assigned to dispatch {}",
                    crew_member_id, dispatch_id
                ),
            )
        })
    }

    async fn assignment_links(&mut self, dispatch_id: i64) -> AppResult<Vec<AssignmentLink>> {
        let links = sqlx::query_as::<_, AssignmentLink>(
            "SELECT * FROM assignment_links WHERE dispatch_id = $1 ORDER BY id",
        )
        .bind(dispatch_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(links)
    }

    async fn active_links_for_crew(&mut self, crew_member_id: i64) -> AppResult<Vec<AssignmentLink>> {
        let links = sqlx::query_as::<_, AssignmentLink>(&format!(
            r#"
            SELECT l.* FROM assignment_links l
            JOIN dispatches d ON d.id = l.dispatch_id
            WHERE l.crew_member_id = $1 AND d.status IN {}
            ORDER BY l.id
            "#,
            ACTIVE_STATUSES
        ))
        .bind(crew_member_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(links)
    }

    async fn delete_assignment_link(&mut self, dispatch_id: i64, crew_member_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM assignment_links WHERE dispatch_id = $1 AND crew_member_id = $2",
        )
        .bind(dispatch_id)
        .bind(crew_member_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_assignment_links(&mut self, dispatch_id: i64) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM assignment_links WHERE dispatch_id = $1")
            .bind(dispatch_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn append_tracking_sample(
        &mut self,
        dispatch_id: i64,
        sample: &NewTrackingSample,
    ) -> AppResult<TrackingSample> {
        let stored = sqlx::query_as::<_, TrackingSample>(
            r#"
            INSERT INTO tracking_samples
                (dispatch_id, latitude, longitude, speed_kmh, altitude_m, accuracy_m, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(dispatch_id)
        .bind(sample.position.latitude)
        .bind(sample.position.longitude)
        .bind(sample.speed_kmh)
        .bind(sample.altitude_m)
        .bind(sample.accuracy_m)
        .bind(sample.recorded_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(stored)
    }

    async fn enqueue_event(&mut self, event: &DispatchEvent) -> AppResult<()> {
        let row = OutboxEvent::from_event(event);
        sqlx::query(
            r#"
            INSERT INTO outbox_events (id, event_type, payload, status, attempts, next_attempt_at, created_at)
            VALUES ($1, $2, $3, 'pending', 0, $4, $5)
            "#,
        )
        .bind(row.id)
        .bind(&row.event_type)
        .bind(&row.payload)
        .bind(row.next_attempt_at)
        .bind(row.created_at)
        .execute(&mut *self.tx)
        .await?;
        debug!(event_id = %row.id, event_type = %row.event_type, "📝 Evento encolado en outbox");
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
