//! Máquina de estados del despacho
//!
//! `pending → assigned → en_route → on_scene → transporting → completed`,
//! con cancelación desde `pending`, `assigned` y `transporting`. Cada
//! transición encola `dispatch.status_changed`; las terminales pasan por el
//! motor de asignación para liberar vehículo y personal en la misma
//! transacción.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::metrics;
use crate::models::crew::AssignedCrew;
use crate::models::dispatch::{
    Dispatch, DispatchFilter, DispatchOutcomeKind, DispatchStatus, NewTrackingSample,
    TrackingSample,
};
use crate::models::event::DispatchEvent;
use crate::repositories::ResourceDirectory;
use crate::services::assignment_service::DispatchAssignmentEngine;
use crate::utils::clock::Clock;
use crate::utils::errors::{invalid_field, not_found_error, AppError, AppResult};
use crate::utils::validation::{ensure_coordinates, validate_rating};

/// Evaluación posterior de un despacho concluido
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchFeedback {
    pub rating: u8,
    pub comment: Option<String>,
    pub patient_outcome: Option<String>,
}

/// Despacho con su personal y su recorrido
#[derive(Debug, Clone, Serialize)]
pub struct DispatchDetails {
    #[serde(flatten)]
    pub dispatch: Dispatch,
    pub crew: Vec<AssignedCrew>,
    pub tracking: Vec<TrackingSample>,
}

pub struct DispatchLifecycle {
    directory: Arc<dyn ResourceDirectory>,
    engine: Arc<DispatchAssignmentEngine>,
    clock: Arc<dyn Clock>,
}

impl DispatchLifecycle {
    pub fn new(
        directory: Arc<dyn ResourceDirectory>,
        engine: Arc<DispatchAssignmentEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory,
            engine,
            clock,
        }
    }

    /// Aplica una transición de estado. Si no está en la tabla, o si es el
    /// estado actual, devuelve `InvalidTransition` sin tocar el despacho.
    pub async fn transition(&self, dispatch_id: i64, next: DispatchStatus) -> AppResult<Dispatch> {
        let mut tx = self.directory.begin().await?;
        let mut dispatch = tx
            .lock_dispatch(dispatch_id)
            .await?
            .ok_or_else(|| not_found_error("Dispatch", dispatch_id))?;

        let previous = dispatch.status;
        if !previous.can_transition_to(next) {
            tx.rollback().await?;
            return Err(AppError::InvalidTransition {
                from: previous,
                to: next,
            });
        }

        let now = self.clock.now();
        let updated = match DispatchOutcomeKind::from_status(next) {
            Some(outcome) => self.engine.conclude_in(tx.as_mut(), dispatch, outcome).await?,
            None => {
                match next {
                    DispatchStatus::Assigned => {
                        if dispatch.vehicle_id.is_none()
                            || tx.assignment_links(dispatch_id).await?.is_empty()
                        {
                            tx.rollback().await?;
                            return Err(AppError::Conflict(format!(
                                "dispatch {} has no vehicle or crew to be assigned",
                                dispatch_id
                            )));
                        }
                        dispatch.assigned_at.get_or_insert(now);
                    }
                    DispatchStatus::EnRoute => {
                        dispatch.assigned_at.get_or_insert(now);
                    }
                    DispatchStatus::OnScene => {
                        dispatch.arrived_at.get_or_insert(now);
                    }
                    _ => {}
                }
                dispatch.status = next;
                dispatch.updated_at = now;
                tx.save_dispatch(&dispatch).await?;
                dispatch
            }
        };

        tx.enqueue_event(&DispatchEvent::status_changed(&updated, previous, next, now))
            .await?;
        tx.commit().await?;

        if let Some(outcome) = DispatchOutcomeKind::from_status(next) {
            metrics::DISPATCH_CONCLUDED
                .with_label_values(&[outcome.as_str()])
                .inc();
        }
        info!(dispatch_id, from = %previous, to = %next, "🔄 Estado de despacho actualizado");
        Ok(updated)
    }

    /// Registra una muestra GPS y mueve el vehículo del despacho a esa posición
    pub async fn record_tracking(
        &self,
        dispatch_id: i64,
        sample: NewTrackingSample,
    ) -> AppResult<TrackingSample> {
        ensure_coordinates("position", sample.position.latitude, sample.position.longitude)?;
        for (field, value) in [("speed_kmh", sample.speed_kmh), ("accuracy_m", sample.accuracy_m)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(invalid_field(field, format!("{} must be non-negative", v)));
                }
            }
        }

        let mut tx = self.directory.begin().await?;
        let dispatch = tx
            .lock_dispatch(dispatch_id)
            .await?
            .ok_or_else(|| not_found_error("Dispatch", dispatch_id))?;
        if dispatch.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "dispatch {} is already {}",
                dispatch_id, dispatch.status
            )));
        }

        let stored = tx.append_tracking_sample(dispatch_id, &sample).await?;
        if let Some(vehicle_id) = dispatch.vehicle_id {
            let vehicle = tx
                .update_vehicle_position(vehicle_id, sample.position, sample.recorded_at)
                .await?;
            tx.enqueue_event(&DispatchEvent::vehicle_location_updated(
                &vehicle,
                self.clock.now(),
            ))
            .await?;
        }
        tx.commit().await?;

        debug!(dispatch_id, sample_id = stored.id, "📍 Muestra de rastreo registrada");
        Ok(stored)
    }

    /// Guarda la evaluación bajo `supplementary.feedback`; solo despachos concluidos
    pub async fn add_feedback(
        &self,
        dispatch_id: i64,
        feedback: DispatchFeedback,
    ) -> AppResult<Dispatch> {
        if validate_rating(feedback.rating).is_err() {
            return Err(invalid_field(
                "rating",
                format!("rating {} is outside 1..5", feedback.rating),
            ));
        }

        let mut tx = self.directory.begin().await?;
        let mut dispatch = tx
            .lock_dispatch(dispatch_id)
            .await?
            .ok_or_else(|| not_found_error("Dispatch", dispatch_id))?;
        if !dispatch.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "dispatch {} has not concluded yet",
                dispatch_id
            )));
        }

        let now = self.clock.now();
        dispatch.supplementary = Some(with_feedback(dispatch.supplementary.take(), &feedback, now));
        dispatch.updated_at = now;
        tx.save_dispatch(&dispatch).await?;
        tx.commit().await?;

        info!(dispatch_id, rating = feedback.rating, "📝 Feedback registrado");
        Ok(dispatch)
    }

    pub async fn details(&self, dispatch_id: i64) -> AppResult<DispatchDetails> {
        let dispatch = self
            .directory
            .get_dispatch(dispatch_id)
            .await?
            .ok_or_else(|| not_found_error("Dispatch", dispatch_id))?;
        let crew = self.directory.dispatch_crew(dispatch_id).await?;
        let tracking = self.directory.tracking_history(dispatch_id).await?;
        Ok(DispatchDetails {
            dispatch,
            crew,
            tracking,
        })
    }

    pub async fn list(&self, filter: &DispatchFilter) -> AppResult<Vec<Dispatch>> {
        self.directory.list_dispatches(filter).await
    }
}

fn with_feedback(
    supplementary: Option<Value>,
    feedback: &DispatchFeedback,
    registered_at: DateTime<Utc>,
) -> Value {
    let mut data = match supplementary {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    data.insert(
        "feedback".to_string(),
        json!({
            "rating": feedback.rating,
            "comment": feedback.comment,
            "patient_outcome": feedback.patient_outcome,
            "registered_at": registered_at.to_rfc3339(),
        }),
    );
    Value::Object(data)
}
