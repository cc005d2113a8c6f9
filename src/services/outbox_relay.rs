//! Entrega asíncrona de eventos del outbox
//!
//! Sondea eventos pendientes, los publica con `EventNotifier` y marca el
//! resultado. Los fallos se reprograman con backoff exponencial
//! (`2^intento` segundos, máximo 5 minutos, con jitter); agotados los
//! intentos el evento queda `dead`. Nunca toca filas de negocio.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::metrics;
use crate::models::dispatch::DispatchOutcomeKind;
use crate::models::event::{DispatchEvent, EventKind, OutboxEvent};
use crate::models::vehicle::VehicleCategory;
use crate::repositories::OutboxStore;
use crate::services::event_notifier::EventNotifier;
use crate::services::travel_time_predictor::{OutcomeReport, TravelTimePredictor};
use crate::utils::clock::Clock;

const MAX_BACKOFF_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub max_attempts: i32,
    /// Tiempo que un evento reclamado queda apartado de otros relays
    pub lease: Duration,
    /// Los eventos entregados hace más de esto se borran del outbox
    pub delivered_retention: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            batch_size: 50,
            max_attempts: 8,
            lease: Duration::from_secs(60),
            delivered_retention: Duration::from_secs(24 * 3600),
        }
    }
}

/// Resultado de una pasada
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub delivered: usize,
    pub retried: usize,
    pub dead: usize,
    pub purged: u64,
}

/// Segundos de espera antes del intento `attempt` (1-based), sin jitter
pub fn backoff_secs(attempt: i32) -> i64 {
    let exponent = attempt.clamp(0, 16) as u32;
    2i64.pow(exponent).min(MAX_BACKOFF_SECS)
}

pub struct OutboxRelay {
    store: Arc<dyn OutboxStore>,
    notifier: Arc<dyn EventNotifier>,
    predictor: Option<Arc<TravelTimePredictor>>,
    clock: Arc<dyn Clock>,
    config: RelayConfig,
}

impl OutboxRelay {
    pub fn new(
        store: Arc<dyn OutboxStore>,
        notifier: Arc<dyn EventNotifier>,
        predictor: Option<Arc<TravelTimePredictor>>,
        clock: Arc<dyn Clock>,
        config: RelayConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            predictor,
            clock,
            config,
        }
    }

    /// Bucle principal; termina cuando `shutdown` cambia a `true`
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            notifier = self.notifier.name(),
            "📬 Outbox relay iniciado"
        );
        loop {
            match self.run_once().await {
                Ok(stats) if stats != RelayStats::default() => debug!(?stats, "Outbox pass"),
                Ok(_) => {}
                Err(e) => error!("❌ Error en outbox relay: {}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("📭 Outbox relay detenido");
    }

    /// Una pasada: reclama un lote y lo entrega
    pub async fn run_once(&self) -> crate::utils::errors::AppResult<RelayStats> {
        let now = self.clock.now();
        let batch = self
            .store
            .claim_due(self.config.batch_size, now, self.config.lease)
            .await?;

        let mut stats = RelayStats::default();
        for row in batch {
            let Some(event) = row.to_event() else {
                warn!(event_id = %row.id, event_type = %row.event_type, "Evento de tipo desconocido");
                self.store
                    .mark_failed(row.id, "unknown event type", None)
                    .await?;
                stats.dead += 1;
                continue;
            };

            match self.notifier.publish(&event).await {
                Ok(()) => {
                    self.store.mark_delivered(row.id, self.clock.now()).await?;
                    stats.delivered += 1;
                    self.after_delivery(&event);
                }
                Err(e) => {
                    metrics::OUTBOX_DELIVERY_FAILURES.inc();
                    match self.retry_at(&row, now) {
                        Some(at) => {
                            warn!(
                                event_id = %row.id,
                                attempts = row.attempts + 1,
                                "⚠️ Entrega fallida, reintento programado: {}", e
                            );
                            self.store.mark_failed(row.id, &e.to_string(), Some(at)).await?;
                            stats.retried += 1;
                        }
                        None => {
                            error!(
                                event_id = %row.id,
                                event_type = %row.event_type,
                                "❌ Entrega agotó los reintentos: {}", e
                            );
                            self.store.mark_failed(row.id, &e.to_string(), None).await?;
                            stats.dead += 1;
                        }
                    }
                }
            }
        }

        let retention = ChronoDuration::from_std(self.config.delivered_retention)
            .unwrap_or_else(|_| ChronoDuration::hours(24));
        stats.purged = self.store.purge_delivered(self.clock.now() - retention).await?;
        Ok(stats)
    }

    fn retry_at(&self, row: &OutboxEvent, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let attempt = row.attempts + 1;
        if attempt >= self.config.max_attempts {
            return None;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..1000);
        Some(
            now + ChronoDuration::seconds(backoff_secs(attempt))
                + ChronoDuration::milliseconds(jitter_ms),
        )
    }

    /// Un despacho completado alimenta al modelo de predicción, sin esperar
    fn after_delivery(&self, event: &DispatchEvent) {
        if event.kind != EventKind::DispatchConcluded
            || event.payload_str("outcome") != Some(DispatchOutcomeKind::Completed.as_str())
        {
            return;
        }
        let (Some(predictor), Some(dispatch_id)) =
            (self.predictor.clone(), event.payload_i64("dispatch_id"))
        else {
            return;
        };

        let report = OutcomeReport {
            dispatch_id,
            distance_km: event.payload.get("distance_km").and_then(|v| v.as_f64()),
            estimated_minutes: event.payload_i64("estimated_minutes"),
            actual_minutes: event.payload_i64("actual_minutes"),
            vehicle_category_code: event
                .payload_str("vehicle_category")
                .and_then(|c| c.parse::<VehicleCategory>().ok())
                .map(|c| c.model_code()),
            priority: event.payload_str("priority").map(str::to_string),
        };
        tokio::spawn(async move {
            predictor.submit_outcome(&report).await;
        });
    }
}
