//! Motor de asignación de despachos
//!
//! Busca la ambulancia disponible más cercana, reserva vehículo y personal
//! en una sola transacción y libera todo al concluir. La falta de recursos
//! no es un error: se devuelve como `DispatchOutcome::NoVehicle` /
//! `DispatchOutcome::NoCrew` y la transacción se descarta sin dejar rastro.
//!
//! El predictor externo nunca se consulta con una transacción abierta: la
//! estimación inicial usa la fórmula a 40 km/h y se refina después del commit.

use chrono::Duration as ChronoDuration;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::models::analytics::{AvailabilitySnapshot, DispatchStatistics};
use crate::models::crew::{AssignedCrew, CrewRole, CrewStatus, RoleQuotas};
use crate::models::dispatch::{
    Dispatch, DispatchOutcomeKind, DispatchStatus, IncidentKind, NewDispatch, Priority,
};
use crate::models::event::DispatchEvent;
use crate::models::geo::GeoPoint;
use crate::models::vehicle::{Vehicle, VehicleCategory, VehicleFilter, VehicleStatus};
use crate::repositories::{DirectoryTx, ResourceDirectory};
use crate::services::geo_calculator::{GeoCalculator, DEFAULT_SPEED_KMH};
use crate::services::travel_time_predictor::{
    PredictionRequest, TravelTimePredictor, DEFAULT_TRAFFIC_FACTOR,
};
use crate::utils::clock::Clock;
use crate::utils::errors::{invalid_field, not_found_error, AppError, AppResult};
use crate::utils::validation::ensure_coordinates;

/// Confianza reportada cuando la sugerencia es la asignación actual
const CURRENT_ASSIGNMENT_CONFIDENCE: f64 = 0.5;

/// Parámetros del motor
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_radius_km: f64,
    /// Candidatos devueltos por `list_vehicles_by_distance` si no se indica
    pub candidate_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_radius_km: 50.0,
            candidate_limit: 5,
        }
    }
}

/// Vehículo candidato con su distancia al origen
#[derive(Debug, Clone, Serialize)]
pub struct VehicleMatch {
    pub vehicle: Vehicle,
    pub distance_km: f64,
    /// Solo en listados por distancia
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<i32>,
}

/// Ambulancia sugerida para un despacho. Diagnóstico: no reasigna nada.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleSuggestion {
    pub dispatch_id: i64,
    pub current_vehicle_id: Option<i64>,
    pub suggested_vehicle_id: Option<i64>,
    pub confidence: f64,
    pub estimated_minutes: Option<i32>,
    pub distance_km: Option<f64>,
    pub reason: String,
    /// `model` si respondió el optimizador, `current` si no
    pub source: &'static str,
}

/// Resultado de reservar personal
#[derive(Debug, Clone, PartialEq)]
pub enum CrewReservation {
    Reserved(Vec<AssignedCrew>),
    /// El primer rol sin cupo suficiente; no se reservó a nadie
    Insufficient {
        role: CrewRole,
        required: u32,
        available: u32,
    },
}

/// Solicitud de despacho entrante
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub request_ref: Option<i64>,
    pub origin: GeoPoint,
    pub origin_address: Option<String>,
    pub destination: Option<GeoPoint>,
    pub destination_address: Option<String>,
    pub priority: Priority,
    pub incident: IncidentKind,
    pub notes: Option<String>,
    pub required_category: Option<VehicleCategory>,
    /// `None` = un conductor y un paramédico
    pub role_quotas: Option<RoleQuotas>,
    pub max_radius_km: Option<f64>,
    pub traffic_factor: Option<f64>,
}

impl DispatchRequest {
    pub fn at(origin: GeoPoint) -> Self {
        Self {
            request_ref: None,
            origin,
            origin_address: None,
            destination: None,
            destination_address: None,
            priority: Priority::default(),
            incident: IncidentKind::default(),
            notes: None,
            required_category: None,
            role_quotas: None,
            max_radius_km: None,
            traffic_factor: None,
        }
    }
}

/// Resultado de `create_dispatch`
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    Created {
        dispatch: Dispatch,
        vehicle: Vehicle,
        crew: Vec<AssignedCrew>,
    },
    NoVehicle,
    NoCrew {
        role: CrewRole,
        required: u32,
        available: u32,
    },
}

pub struct DispatchAssignmentEngine {
    directory: Arc<dyn ResourceDirectory>,
    predictor: Arc<TravelTimePredictor>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl DispatchAssignmentEngine {
    pub fn new(
        directory: Arc<dyn ResourceDirectory>,
        predictor: Arc<TravelTimePredictor>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            directory,
            predictor,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn resolve_radius(&self, requested: Option<f64>) -> AppResult<f64> {
        match requested {
            None => Ok(self.config.max_radius_km),
            Some(radius) if radius.is_finite() && radius > 0.0 => Ok(radius),
            Some(radius) => Err(invalid_field(
                "max_radius_km",
                format!("radius {} must be a positive number", radius),
            )),
        }
    }

    /// Vehículo disponible más cercano dentro del radio; `None` si no hay
    pub async fn find_nearest_available_vehicle(
        &self,
        origin: GeoPoint,
        category: Option<VehicleCategory>,
        max_radius_km: Option<f64>,
    ) -> AppResult<Option<VehicleMatch>> {
        ensure_coordinates("origin", origin.latitude, origin.longitude)?;
        let radius = self.resolve_radius(max_radius_km)?;

        let vehicles = self
            .directory
            .list_vehicles(&VehicleFilter {
                status: Some(VehicleStatus::Available),
                category,
            })
            .await?;

        Ok(GeoCalculator::nearest(origin, &vehicles)
            .filter(|ranked| ranked.distance_km <= radius)
            .map(|ranked| VehicleMatch {
                vehicle: ranked.candidate.clone(),
                distance_km: ranked.distance_km,
                estimated_minutes: None,
            }))
    }

    /// Vehículos disponibles ordenados por distancia, con el tiempo estimado
    /// de cada uno en un solo llamado al modelo
    pub async fn list_vehicles_by_distance(
        &self,
        origin: GeoPoint,
        category: Option<VehicleCategory>,
        limit: Option<usize>,
    ) -> AppResult<Vec<VehicleMatch>> {
        ensure_coordinates("origin", origin.latitude, origin.longitude)?;
        let limit = limit.unwrap_or(self.config.candidate_limit).max(1);

        let vehicles = self
            .directory
            .list_vehicles(&VehicleFilter {
                status: Some(VehicleStatus::Available),
                category,
            })
            .await?;

        let ranked: Vec<_> = GeoCalculator::rank_by_distance(origin, &vehicles)
            .into_iter()
            .take(limit)
            .collect();
        let requests: Vec<PredictionRequest> = ranked
            .iter()
            .map(|r| PredictionRequest {
                distance_km: r.distance_km,
                category: r.candidate.category,
                traffic_factor: DEFAULT_TRAFFIC_FACTOR,
            })
            .collect();
        let estimates = self.predictor.predict_batch(&requests).await;

        Ok(ranked
            .into_iter()
            .zip(estimates)
            .map(|(ranked, minutes)| VehicleMatch {
                vehicle: ranked.candidate.clone(),
                distance_km: ranked.distance_km,
                estimated_minutes: Some(minutes),
            })
            .collect())
    }

    /// Cupos de la solicitud: `None` usa los de siempre, vacíos es un error
    fn resolve_quotas(quotas: Option<RoleQuotas>) -> AppResult<RoleQuotas> {
        match quotas {
            None => Ok(RoleQuotas::default()),
            Some(quotas) if quotas.total() == 0 => Err(invalid_field(
                "crew",
                "at least one crew member is required",
            )),
            Some(quotas) => Ok(quotas),
        }
    }

    /// Elige y bloquea el vehículo más cercano dentro del radio. Si otro
    /// despacho se adelanta con un candidato, pasa al siguiente.
    async fn select_vehicle(
        &self,
        tx: &mut dyn DirectoryTx,
        origin: GeoPoint,
        category: Option<VehicleCategory>,
        radius_km: f64,
    ) -> AppResult<Option<VehicleMatch>> {
        let candidates = tx.list_available_vehicles(category).await?;
        let ranked = GeoCalculator::rank_by_distance(origin, &candidates);

        for candidate in ranked.into_iter().take_while(|r| r.distance_km <= radius_km) {
            match tx.try_lock_available_vehicle(candidate.candidate.id).await? {
                Some(vehicle) => {
                    return Ok(Some(VehicleMatch {
                        vehicle,
                        distance_km: candidate.distance_km,
                        estimated_minutes: None,
                    }))
                }
                None => debug!(
                    vehicle_id = candidate.candidate.id,
                    "Vehículo tomado por otro despacho, probando el siguiente"
                ),
            }
        }
        Ok(None)
    }

    /// Reserva personal dentro de `tx`. Bloquea todos los roles antes de
    /// escribir; si alguno no completa su cupo no escribe nada.
    async fn reserve_crew_in(
        &self,
        tx: &mut dyn DirectoryTx,
        dispatch_id: i64,
        quotas: &RoleQuotas,
    ) -> AppResult<CrewReservation> {
        let mut selected = Vec::new();
        for (role, required) in quotas.iter() {
            let members = tx.lock_available_crew(role, i64::from(required)).await?;
            let available = u32::try_from(members.len()).unwrap_or(u32::MAX);
            if available < required {
                return Ok(CrewReservation::Insufficient {
                    role,
                    required,
                    available,
                });
            }
            selected.extend(members.into_iter().map(|member| (role, member)));
        }

        let mut first_link = tx.assignment_links(dispatch_id).await?.is_empty();
        let mut assigned = Vec::with_capacity(selected.len());
        for (role, mut member) in selected {
            let responsible = first_link;
            first_link = false;
            tx.create_assignment_link(dispatch_id, member.id, role, responsible)
                .await?;
            tx.update_crew_status(member.id, CrewStatus::InService).await?;
            member.status = CrewStatus::InService;
            assigned.push(AssignedCrew {
                member,
                role,
                responsible,
            });
        }
        Ok(CrewReservation::Reserved(assigned))
    }

    /// Reserva personal adicional para un despacho activo, todo o nada
    pub async fn reserve_crew(
        &self,
        dispatch_id: i64,
        quotas: Option<RoleQuotas>,
    ) -> AppResult<CrewReservation> {
        let quotas = Self::resolve_quotas(quotas)?;
        let mut tx = self.directory.begin().await?;
        let dispatch = tx
            .lock_dispatch(dispatch_id)
            .await?
            .ok_or_else(|| not_found_error("Dispatch", dispatch_id))?;
        if !dispatch.status.is_active() {
            tx.rollback().await?;
            return Err(AppError::Conflict(format!(
                "dispatch {} is {} and cannot take crew",
                dispatch_id, dispatch.status
            )));
        }

        let reservation = self.reserve_crew_in(tx.as_mut(), dispatch_id, &quotas).await?;
        match &reservation {
            CrewReservation::Reserved(crew) => {
                tx.commit().await?;
                info!(dispatch_id, crew = crew.len(), "👥 Personal reservado");
            }
            CrewReservation::Insufficient { role, required, available } => {
                tx.rollback().await?;
                warn!(dispatch_id, %role, required, available, "⚠️ Personal insuficiente");
            }
        }
        Ok(reservation)
    }

    /// Crea un despacho con vehículo y personal, o ninguno de los dos
    pub async fn create_dispatch(&self, request: DispatchRequest) -> AppResult<DispatchOutcome> {
        let origin = request.origin;
        ensure_coordinates("origin", origin.latitude, origin.longitude)?;
        if let Some(destination) = request.destination {
            ensure_coordinates("destination", destination.latitude, destination.longitude)?;
        }
        let radius = self.resolve_radius(request.max_radius_km)?;
        let traffic_factor = match request.traffic_factor {
            None => DEFAULT_TRAFFIC_FACTOR,
            Some(f) if (0.0..=1.0).contains(&f) => f,
            Some(f) => {
                return Err(invalid_field(
                    "traffic_factor",
                    format!("traffic factor {} is outside 0..1", f),
                ))
            }
        };
        let quotas = Self::resolve_quotas(request.role_quotas.clone())?;

        let mut tx = self.directory.begin().await?;

        let Some(matched) = self
            .select_vehicle(tx.as_mut(), origin, request.required_category, radius)
            .await?
        else {
            tx.rollback().await?;
            metrics::DISPATCH_REJECTED.with_label_values(&["no_vehicle"]).inc();
            warn!(
                lat = origin.latitude,
                lng = origin.longitude,
                radius_km = radius,
                "🚫 Sin ambulancias disponibles en el radio"
            );
            return Ok(DispatchOutcome::NoVehicle);
        };

        let now = self.clock.now();
        let estimate = GeoCalculator::estimate_travel_time(matched.distance_km, DEFAULT_SPEED_KMH);
        let mut dispatch = tx
            .create_dispatch(&NewDispatch {
                request_ref: request.request_ref,
                vehicle_id: Some(matched.vehicle.id),
                origin,
                origin_address: request.origin_address,
                destination: request.destination,
                destination_address: request.destination_address,
                distance_km: Some(matched.distance_km),
                estimated_minutes: Some(estimate),
                status: DispatchStatus::Assigned,
                priority: request.priority,
                incident: request.incident,
                notes: request.notes,
                supplementary: None,
                requested_at: now,
                assigned_at: Some(now),
            })
            .await?;

        tx.update_vehicle_status(matched.vehicle.id, VehicleStatus::InService)
            .await?;
        let mut vehicle = matched.vehicle;
        vehicle.status = VehicleStatus::InService;

        let crew = match self.reserve_crew_in(tx.as_mut(), dispatch.id, &quotas).await? {
            CrewReservation::Reserved(crew) => crew,
            CrewReservation::Insufficient { role, required, available } => {
                tx.rollback().await?;
                metrics::DISPATCH_REJECTED.with_label_values(&["no_crew"]).inc();
                warn!(%role, required, available, "🚫 Personal insuficiente, despacho descartado");
                return Ok(DispatchOutcome::NoCrew {
                    role,
                    required,
                    available,
                });
            }
        };

        tx.enqueue_event(&DispatchEvent::dispatch_created(&dispatch, crew.len(), now))
            .await?;
        tx.commit().await?;

        metrics::DISPATCH_CREATED.inc();
        info!(
            dispatch_id = dispatch.id,
            vehicle_id = vehicle.id,
            distance_km = matched.distance_km,
            crew = crew.len(),
            "🚑 Despacho creado"
        );

        let refined = self
            .predictor
            .predict(matched.distance_km, vehicle.category, traffic_factor)
            .await;
        if refined > 0 && Some(refined) != dispatch.estimated_minutes {
            match self.record_refined_estimate(dispatch.id, refined).await {
                Ok(()) => dispatch.estimated_minutes = Some(refined),
                Err(e) => warn!(dispatch_id = dispatch.id, "⚠️ No se pudo guardar la estimación refinada: {}", e),
            }
        }

        Ok(DispatchOutcome::Created {
            dispatch,
            vehicle,
            crew,
        })
    }

    /// Dota de vehículo y personal a un despacho `pending` y lo pasa a
    /// `assigned`, todo en una transacción. Sin recursos el despacho queda
    /// `pending` sin cambios.
    pub async fn assign_pending(
        &self,
        dispatch_id: i64,
        quotas: Option<RoleQuotas>,
        category: Option<VehicleCategory>,
        max_radius_km: Option<f64>,
    ) -> AppResult<DispatchOutcome> {
        let quotas = Self::resolve_quotas(quotas)?;
        let radius = self.resolve_radius(max_radius_km)?;

        let mut tx = self.directory.begin().await?;
        let mut dispatch = tx
            .lock_dispatch(dispatch_id)
            .await?
            .ok_or_else(|| not_found_error("Dispatch", dispatch_id))?;
        if dispatch.status != DispatchStatus::Pending {
            tx.rollback().await?;
            return Err(AppError::InvalidTransition {
                from: dispatch.status,
                to: DispatchStatus::Assigned,
            });
        }

        let origin = dispatch.origin();
        let Some(matched) = self.select_vehicle(tx.as_mut(), origin, category, radius).await? else {
            tx.rollback().await?;
            metrics::DISPATCH_REJECTED.with_label_values(&["no_vehicle"]).inc();
            warn!(dispatch_id, radius_km = radius, "🚫 Sin ambulancias para el despacho pendiente");
            return Ok(DispatchOutcome::NoVehicle);
        };

        let now = self.clock.now();
        dispatch.vehicle_id = Some(matched.vehicle.id);
        dispatch.distance_km = Some(matched.distance_km);
        dispatch.estimated_minutes = Some(GeoCalculator::estimate_travel_time(
            matched.distance_km,
            DEFAULT_SPEED_KMH,
        ));
        dispatch.status = DispatchStatus::Assigned;
        dispatch.assigned_at = Some(now);
        dispatch.updated_at = now;
        tx.save_dispatch(&dispatch).await?;

        tx.update_vehicle_status(matched.vehicle.id, VehicleStatus::InService)
            .await?;
        let mut vehicle = matched.vehicle;
        vehicle.status = VehicleStatus::InService;

        let crew = match self.reserve_crew_in(tx.as_mut(), dispatch_id, &quotas).await? {
            CrewReservation::Reserved(crew) => crew,
            CrewReservation::Insufficient { role, required, available } => {
                tx.rollback().await?;
                metrics::DISPATCH_REJECTED.with_label_values(&["no_crew"]).inc();
                warn!(dispatch_id, %role, required, available, "🚫 Personal insuficiente, el despacho sigue pendiente");
                return Ok(DispatchOutcome::NoCrew {
                    role,
                    required,
                    available,
                });
            }
        };

        tx.enqueue_event(&DispatchEvent::status_changed(
            &dispatch,
            DispatchStatus::Pending,
            DispatchStatus::Assigned,
            now,
        ))
        .await?;
        tx.commit().await?;

        info!(
            dispatch_id,
            vehicle_id = vehicle.id,
            distance_km = matched.distance_km,
            crew = crew.len(),
            "🚑 Despacho pendiente asignado"
        );

        let refined = self
            .predictor
            .predict(matched.distance_km, vehicle.category, DEFAULT_TRAFFIC_FACTOR)
            .await;
        if refined > 0 && Some(refined) != dispatch.estimated_minutes {
            match self.record_refined_estimate(dispatch_id, refined).await {
                Ok(()) => dispatch.estimated_minutes = Some(refined),
                Err(e) => warn!(dispatch_id, "⚠️ No se pudo guardar la estimación refinada: {}", e),
            }
        }

        Ok(DispatchOutcome::Created {
            dispatch,
            vehicle,
            crew,
        })
    }

    async fn record_refined_estimate(&self, dispatch_id: i64, minutes: i32) -> AppResult<()> {
        let mut tx = self.directory.begin().await?;
        tx.update_estimated_minutes(dispatch_id, minutes).await?;
        tx.commit().await
    }

    /// Devuelve el personal a `available` y borra sus vínculos, dentro de `tx`
    pub(crate) async fn release_crew_in(
        &self,
        tx: &mut dyn DirectoryTx,
        dispatch_id: i64,
    ) -> AppResult<u64> {
        let links = tx.assignment_links(dispatch_id).await?;
        for link in &links {
            tx.update_crew_status(link.crew_member_id, CrewStatus::Available)
                .await?;
        }
        tx.delete_assignment_links(dispatch_id).await
    }

    /// Libera el personal que quede vinculado a un despacho no activo, de
    /// forma atómica. Un despacho activo conserva su personal: se libera al
    /// concluirlo.
    pub async fn release_crew(&self, dispatch_id: i64) -> AppResult<u64> {
        let mut tx = self.directory.begin().await?;
        let dispatch = tx
            .lock_dispatch(dispatch_id)
            .await?
            .ok_or_else(|| not_found_error("Dispatch", dispatch_id))?;
        if dispatch.status.is_active() {
            tx.rollback().await?;
            return Err(AppError::Conflict(format!(
                "dispatch {} is {}; conclude it to release its crew",
                dispatch_id, dispatch.status
            )));
        }
        let released = self.release_crew_in(tx.as_mut(), dispatch_id).await?;
        tx.commit().await?;
        info!(dispatch_id, released, "👥 Personal liberado");
        Ok(released)
    }

    /// Marca el despacho como concluido y libera vehículo y personal dentro
    /// de `tx`. Encola `dispatch.concluded`; el llamador decide el commit.
    pub(crate) async fn conclude_in(
        &self,
        tx: &mut dyn DirectoryTx,
        mut dispatch: Dispatch,
        outcome: DispatchOutcomeKind,
    ) -> AppResult<Dispatch> {
        let now = self.clock.now();
        let concluded_at = *dispatch.concluded_at.get_or_insert(now);
        if dispatch.actual_minutes.is_none() {
            dispatch.actual_minutes = dispatch.actual_duration_minutes(concluded_at);
        }
        dispatch.status = outcome.status();
        dispatch.updated_at = now;
        tx.save_dispatch(&dispatch).await?;

        let mut vehicle_category = None;
        if let Some(vehicle_id) = dispatch.vehicle_id {
            let vehicle = tx
                .lock_vehicle(vehicle_id)
                .await?
                .ok_or_else(|| not_found_error("Vehicle", vehicle_id))?;
            tx.update_vehicle_status(vehicle_id, VehicleStatus::Available)
                .await?;
            vehicle_category = Some(vehicle.category);
        }

        self.release_crew_in(tx, dispatch.id).await?;

        tx.enqueue_event(&DispatchEvent::concluded(
            &dispatch,
            outcome,
            vehicle_category.as_ref().map(VehicleCategory::as_str),
            now,
        ))
        .await?;
        Ok(dispatch)
    }

    /// Concluye un despacho (`completed` o `cancelled`).
    ///
    /// No consulta la tabla de transiciones: es la operación de recursos que
    /// usa `DispatchLifecycle`. Repetir la misma conclusión devuelve el
    /// despacho sin cambios; concluir con otro resultado es `InvalidTransition`.
    pub async fn conclude_dispatch(
        &self,
        dispatch_id: i64,
        outcome: DispatchOutcomeKind,
    ) -> AppResult<Dispatch> {
        let mut tx = self.directory.begin().await?;
        let dispatch = tx
            .lock_dispatch(dispatch_id)
            .await?
            .ok_or_else(|| not_found_error("Dispatch", dispatch_id))?;

        if dispatch.status.is_terminal() {
            tx.rollback().await?;
            if dispatch.status == outcome.status() {
                return Ok(dispatch);
            }
            return Err(AppError::InvalidTransition {
                from: dispatch.status,
                to: outcome.status(),
            });
        }

        let previous = dispatch.status;
        let concluded = self.conclude_in(tx.as_mut(), dispatch, outcome).await?;
        tx.enqueue_event(&DispatchEvent::status_changed(
            &concluded,
            previous,
            concluded.status,
            self.clock.now(),
        ))
        .await?;
        tx.commit().await?;

        metrics::DISPATCH_CONCLUDED
            .with_label_values(&[outcome.as_str()])
            .inc();
        info!(
            dispatch_id,
            outcome = outcome.as_str(),
            actual_minutes = ?concluded.actual_minutes,
            "🏁 Despacho concluido"
        );
        Ok(concluded)
    }

    /// Consulta al optimizador externo qué ambulancia elegiría. Sin
    /// respuesta, la sugerencia es la asignación actual.
    pub async fn suggest_vehicle(&self, dispatch_id: i64) -> AppResult<VehicleSuggestion> {
        let dispatch = self
            .directory
            .get_dispatch(dispatch_id)
            .await?
            .ok_or_else(|| not_found_error("Dispatch", dispatch_id))?;

        let suggestion = match self.predictor.suggest_vehicle(&dispatch).await {
            Some(model) => VehicleSuggestion {
                dispatch_id,
                current_vehicle_id: dispatch.vehicle_id,
                suggested_vehicle_id: model.vehicle_id,
                confidence: model.confidence,
                estimated_minutes: model.estimated_minutes,
                distance_km: model.distance_km,
                reason: model
                    .reason
                    .unwrap_or_else(|| "automatic optimization".to_string()),
                source: "model",
            },
            None => VehicleSuggestion {
                dispatch_id,
                current_vehicle_id: dispatch.vehicle_id,
                suggested_vehicle_id: dispatch.vehicle_id,
                confidence: CURRENT_ASSIGNMENT_CONFIDENCE,
                estimated_minutes: dispatch.estimated_minutes,
                distance_km: dispatch.distance_km,
                reason: "ML service unavailable".to_string(),
                source: "current",
            },
        };
        debug!(
            dispatch_id,
            suggested = ?suggestion.suggested_vehicle_id,
            source = suggestion.source,
            "Sugerencia de ambulancia"
        );
        Ok(suggestion)
    }

    pub async fn availability_snapshot(&self) -> AppResult<AvailabilitySnapshot> {
        self.directory.availability_counts().await
    }

    /// Conteos de las últimas `hours` horas y tasa de completados
    pub async fn dispatch_statistics(&self, hours: i64) -> AppResult<DispatchStatistics> {
        if !(1..=24 * 366).contains(&hours) {
            return Err(invalid_field(
                "hours",
                format!("window of {} hours is outside 1..8784", hours),
            ));
        }
        let since = self.clock.now() - ChronoDuration::hours(hours);
        let counts = self.directory.dispatch_counts(since).await?;

        let by_status: BTreeMap<String, i64> = counts.by_status.into_iter().collect();
        let by_priority: BTreeMap<String, i64> = counts.by_priority.into_iter().collect();
        let total: i64 = by_status.values().sum();
        let completed = by_status
            .get(DispatchStatus::Completed.as_str())
            .copied()
            .unwrap_or(0);

        Ok(DispatchStatistics {
            window_hours: hours,
            total,
            by_status,
            by_priority,
            completion_rate: DispatchStatistics::completion_rate_of(completed, total),
        })
    }
}
