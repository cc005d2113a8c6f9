//! Predicción de tiempos de viaje
//!
//! Envuelve el modelo externo con cache y una fórmula local determinista.
//! Ningún método propaga fallos del modelo: si el servicio no responde a
//! tiempo, responde con error o devuelve basura, se usa la fórmula.

use chrono::{Datelike, Timelike};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{CacheExt, CacheOperations};
use crate::clients::ml_client::{FeatureVector, ModelSuggestion, SuggestionQuery, TravelTimeModel};
use crate::metrics;
use crate::models::dispatch::Dispatch;
use crate::models::vehicle::VehicleCategory;
use crate::services::geo_calculator::GeoCalculator;
use crate::utils::clock::{local_offset, Clock};

/// Factor de tráfico cuando el llamador no lo conoce
pub const DEFAULT_TRAFFIC_FACTOR: f64 = 0.5;

/// Parámetros del predictor
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    pub timeout: Duration,
    pub cache_ttl_secs: u64,
    pub utc_offset_hours: i32,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            cache_ttl_secs: 3600,
            utc_offset_hours: -4,
        }
    }
}

/// Una solicitud dentro de un lote
#[derive(Debug, Clone, Copy)]
pub struct PredictionRequest {
    pub distance_km: f64,
    pub category: VehicleCategory,
    pub traffic_factor: f64,
}

/// Datos reales vs. estimados de un despacho concluido
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeReport {
    #[serde(rename = "despacho_id")]
    pub dispatch_id: i64,
    #[serde(rename = "distancia_km")]
    pub distance_km: Option<f64>,
    #[serde(rename = "tiempo_estimado")]
    pub estimated_minutes: Option<i64>,
    #[serde(rename = "tiempo_real")]
    pub actual_minutes: Option<i64>,
    #[serde(rename = "tipo_ambulancia")]
    pub vehicle_category_code: Option<u8>,
    #[serde(rename = "prioridad")]
    pub priority: Option<String>,
}

pub struct TravelTimePredictor {
    model: Arc<dyn TravelTimeModel>,
    cache: Option<Arc<dyn CacheOperations>>,
    clock: Arc<dyn Clock>,
    config: PredictorConfig,
}

impl TravelTimePredictor {
    pub fn new(
        model: Arc<dyn TravelTimeModel>,
        cache: Option<Arc<dyn CacheOperations>>,
        clock: Arc<dyn Clock>,
        config: PredictorConfig,
    ) -> Self {
        Self {
            model,
            cache,
            clock,
            config,
        }
    }

    /// Hora local actual (0-23)
    fn local_hour(&self) -> u32 {
        self.clock
            .now()
            .with_timezone(&local_offset(self.config.utc_offset_hours))
            .hour()
    }

    pub fn features(
        &self,
        distance_km: f64,
        category: VehicleCategory,
        traffic_factor: f64,
    ) -> FeatureVector {
        let local = self
            .clock
            .now()
            .with_timezone(&local_offset(self.config.utc_offset_hours));
        FeatureVector {
            distance_km,
            hour_of_day: local.hour(),
            day_of_week: local.weekday().num_days_from_sunday(),
            vehicle_category_code: category.model_code(),
            traffic_factor,
        }
    }

    fn cache_key(features: &FeatureVector) -> String {
        let encoded = serde_json::to_string(features).unwrap_or_default();
        format!("ms_despacho:ml_prediction:{:x}", md5::compute(encoded))
    }

    /// Velocidad media urbana (km/h) según la hora local
    pub fn fallback_speed_kmh(hour: u32) -> f64 {
        match hour {
            7..=9 => 25.0,
            12..=14 => 30.0,
            18..=20 => 25.0,
            h if h >= 22 || h <= 5 => 50.0,
            _ => 40.0,
        }
    }

    /// Estimación local: distancia / velocidad horaria, techo a minutos
    pub fn fallback_estimate(&self, distance_km: f64) -> i32 {
        let speed = Self::fallback_speed_kmh(self.local_hour());
        let minutes = GeoCalculator::estimate_travel_time(distance_km, speed);
        metrics::TRAVEL_TIME_FALLBACK.inc();
        debug!(distance_km, speed, minutes, "Usando estimación fallback");
        minutes
    }

    fn accept(value: f64) -> Option<i32> {
        if value.is_finite() && value > 0.0 && value < i32::MAX as f64 {
            Some(value.ceil() as i32)
        } else {
            None
        }
    }

    /// Minutos estimados; nunca falla
    pub async fn predict(
        &self,
        distance_km: f64,
        category: VehicleCategory,
        traffic_factor: f64,
    ) -> i32 {
        if !(distance_km > 0.0) {
            return 0;
        }

        let features = self.features(distance_km, category, traffic_factor);
        let key = Self::cache_key(&features);

        if let Some(cache) = &self.cache {
            match cache.get::<i32>(&key).await {
                Ok(Some(minutes)) if minutes > 0 => {
                    debug!(distance_km, minutes, "Predicción ML obtenida de cache");
                    return minutes;
                }
                Ok(_) => {}
                Err(e) => debug!("Cache no disponible, continuando sin cache: {}", e),
            }
        }

        let outcome = tokio::time::timeout(self.config.timeout, self.model.predict(&features)).await;
        let minutes = match outcome {
            Ok(Ok(value)) => match Self::accept(value) {
                Some(minutes) => minutes,
                None => {
                    warn!(distance_km, value, "⚠️ Predicción ML fuera de rango");
                    return self.fallback_estimate(distance_km);
                }
            },
            Ok(Err(e)) => {
                warn!(distance_km, "⚠️ Error al llamar servicio ML: {}", e);
                return self.fallback_estimate(distance_km);
            }
            Err(_) => {
                warn!(distance_km, "⚠️ Servicio ML excedió el timeout");
                return self.fallback_estimate(distance_km);
            }
        };

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&key, &minutes, self.config.cache_ttl_secs).await {
                debug!("No se pudo cachear la predicción: {}", e);
            }
        }

        info!(distance_km, minutes, "Predicción ML exitosa");
        minutes
    }

    /// Un solo llamado por lote; si falla, fórmula local por elemento
    pub async fn predict_batch(&self, requests: &[PredictionRequest]) -> Vec<i32> {
        if requests.is_empty() {
            return Vec::new();
        }

        let features: Vec<FeatureVector> = requests
            .iter()
            .map(|r| self.features(r.distance_km, r.category, r.traffic_factor))
            .collect();

        let outcome = tokio::time::timeout(
            self.config.timeout * 2,
            self.model.predict_batch(&features),
        )
        .await;

        match outcome {
            Ok(Ok(values)) if values.len() == requests.len() => values
                .into_iter()
                .zip(requests)
                .map(|(value, request)| {
                    Self::accept(value).unwrap_or_else(|| self.fallback_estimate(request.distance_km))
                })
                .collect(),
            Ok(Ok(_)) | Ok(Err(_)) | Err(_) => {
                warn!(size = requests.len(), "⚠️ Error en predicción batch, usando fallback");
                requests
                    .iter()
                    .map(|r| self.fallback_estimate(r.distance_km))
                    .collect()
            }
        }
    }

    /// Sonda de vida del modelo externo; solo diagnóstico
    pub async fn is_available(&self) -> bool {
        tokio::time::timeout(self.config.timeout, self.model.health())
            .await
            .unwrap_or(false)
    }

    /// Métricas de evaluación del modelo; `None` si el servicio no responde
    pub async fn evaluation(&self) -> Option<serde_json::Value> {
        match tokio::time::timeout(self.config.timeout, self.model.evaluate()).await {
            Ok(Ok(metrics)) => Some(metrics),
            Ok(Err(e)) => {
                warn!("⚠️ Error al evaluar modelo ML: {}", e);
                None
            }
            Err(_) => {
                warn!("⚠️ Evaluación del modelo ML excedió el timeout");
                None
            }
        }
    }

    /// Ambulancia que el optimizador externo elegiría para el despacho
    pub async fn suggest_vehicle(&self, dispatch: &Dispatch) -> Option<ModelSuggestion> {
        let query = SuggestionQuery {
            dispatch_id: dispatch.id,
            origin_lat: dispatch.origin_lat,
            origin_lng: dispatch.origin_lng,
            destination_lat: dispatch.destination_lat,
            destination_lng: dispatch.destination_lng,
            priority: dispatch.priority.to_string(),
        };
        match tokio::time::timeout(self.config.timeout, self.model.suggest_vehicle(&query)).await {
            Ok(Ok(suggestion)) => Some(suggestion),
            Ok(Err(e)) => {
                warn!(dispatch_id = dispatch.id, "⚠️ Optimizador ML no disponible: {}", e);
                None
            }
            Err(_) => {
                warn!(dispatch_id = dispatch.id, "⚠️ Optimizador ML excedió el timeout");
                None
            }
        }
    }

    /// Envío best-effort de datos reales para reentrenamiento
    pub async fn submit_outcome(&self, report: &OutcomeReport) {
        let payload = match serde_json::to_value(report) {
            Ok(payload) => payload,
            Err(e) => {
                debug!("No se pudo serializar el reporte: {}", e);
                return;
            }
        };
        match tokio::time::timeout(self.config.timeout, self.model.feedback(&payload)).await {
            Ok(Ok(())) => info!(dispatch_id = report.dispatch_id, "Datos enviados para reentrenamiento"),
            Ok(Err(e)) => debug!(dispatch_id = report.dispatch_id, "No se pudieron enviar datos de reentrenamiento: {}", e),
            Err(_) => debug!(dispatch_id = report.dispatch_id, "Timeout enviando datos de reentrenamiento"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::utils::clock::FixedClock;
    use anyhow::anyhow;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingModel;

    #[async_trait::async_trait]
    impl TravelTimeModel for FailingModel {
        async fn predict(&self, _: &FeatureVector) -> anyhow::Result<f64> {
            Err(anyhow!("connection refused"))
        }
        async fn predict_batch(&self, _: &[FeatureVector]) -> anyhow::Result<Vec<f64>> {
            Err(anyhow!("connection refused"))
        }
        async fn health(&self) -> bool {
            false
        }
        async fn feedback(&self, _: &serde_json::Value) -> anyhow::Result<()> {
            Err(anyhow!("connection refused"))
        }
    }

    struct CountingModel {
        calls: AtomicUsize,
        minutes: f64,
    }

    #[async_trait::async_trait]
    impl TravelTimeModel for CountingModel {
        async fn predict(&self, _: &FeatureVector) -> anyhow::Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.minutes)
        }
        async fn predict_batch(&self, f: &[FeatureVector]) -> anyhow::Result<Vec<f64>> {
            Ok(vec![self.minutes; f.len()])
        }
        async fn health(&self) -> bool {
            true
        }
        async fn feedback(&self, _: &serde_json::Value) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// 12:00 UTC = 08:00 en La Paz (hora pico)
    fn rush_hour_clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap()))
    }

    #[test]
    fn test_fallback_speed_table() {
        assert_eq!(TravelTimePredictor::fallback_speed_kmh(8), 25.0);
        assert_eq!(TravelTimePredictor::fallback_speed_kmh(13), 30.0);
        assert_eq!(TravelTimePredictor::fallback_speed_kmh(19), 25.0);
        assert_eq!(TravelTimePredictor::fallback_speed_kmh(23), 50.0);
        assert_eq!(TravelTimePredictor::fallback_speed_kmh(3), 50.0);
        assert_eq!(TravelTimePredictor::fallback_speed_kmh(16), 40.0);
    }

    #[tokio::test]
    async fn test_failing_model_falls_back() {
        let predictor = TravelTimePredictor::new(
            Arc::new(FailingModel),
            None,
            rush_hour_clock(),
            PredictorConfig::default(),
        );
        // 10 km a 25 km/h = 24 minutos
        assert_eq!(predictor.predict(10.0, VehicleCategory::Basic, 0.5).await, 24);
        assert!(!predictor.is_available().await);
        assert!(predictor.evaluation().await.is_none());
    }

    #[tokio::test]
    async fn test_batch_falls_back_per_item() {
        let predictor = TravelTimePredictor::new(
            Arc::new(FailingModel),
            None,
            rush_hour_clock(),
            PredictorConfig::default(),
        );
        let requests = [
            PredictionRequest {
                distance_km: 10.0,
                category: VehicleCategory::Basic,
                traffic_factor: 0.5,
            },
            PredictionRequest {
                distance_km: 1.0,
                category: VehicleCategory::Advanced,
                traffic_factor: 0.2,
            },
        ];
        assert_eq!(predictor.predict_batch(&requests).await, vec![24, 3]);
    }

    #[tokio::test]
    async fn test_successful_prediction_is_cached() {
        let model = Arc::new(CountingModel {
            calls: AtomicUsize::new(0),
            minutes: 6.2,
        });
        let predictor = TravelTimePredictor::new(
            model.clone(),
            Some(Arc::new(MemoryCache::new())),
            rush_hour_clock(),
            PredictorConfig::default(),
        );
        assert_eq!(predictor.predict(3.0, VehicleCategory::Intermediate, 0.5).await, 7);
        assert_eq!(predictor.predict(3.0, VehicleCategory::Intermediate, 0.5).await, 7);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_nonsense_prediction_uses_fallback() {
        let predictor = TravelTimePredictor::new(
            Arc::new(CountingModel {
                calls: AtomicUsize::new(0),
                minutes: -3.0,
            }),
            None,
            rush_hour_clock(),
            PredictorConfig::default(),
        );
        assert_eq!(predictor.predict(5.0, VehicleCategory::Basic, 0.5).await, 12);
    }

    #[test]
    fn test_features_use_local_time() {
        let predictor = TravelTimePredictor::new(
            Arc::new(FailingModel),
            None,
            rush_hour_clock(),
            PredictorConfig::default(),
        );
        let features = predictor.features(2.0, VehicleCategory::CriticalCare, 0.7);
        assert_eq!(features.hour_of_day, 8);
        // 2024-03-04 es lunes
        assert_eq!(features.day_of_week, 1);
        assert_eq!(features.vehicle_category_code, 3);
    }
}
