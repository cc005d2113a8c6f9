//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum. Los servicios se construyen una sola vez
//! sobre el mismo directorio de recursos y el mismo reloj.

use std::sync::Arc;

use crate::cache::redis_client::RedisClient;
use crate::cache::CacheOperations;
use crate::config::environment::EnvironmentConfig;
use crate::repositories::ResourceDirectory;
use crate::services::assignment_service::{DispatchAssignmentEngine, EngineConfig};
use crate::services::auth_service::TokenVerifier;
use crate::services::dispatch_lifecycle::DispatchLifecycle;
use crate::services::fleet_service::FleetService;
use crate::services::travel_time_predictor::TravelTimePredictor;
use crate::utils::clock::Clock;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EnvironmentConfig>,
    pub directory: Arc<dyn ResourceDirectory>,
    pub engine: Arc<DispatchAssignmentEngine>,
    pub lifecycle: Arc<DispatchLifecycle>,
    pub fleet: Arc<FleetService>,
    pub predictor: Arc<TravelTimePredictor>,
    pub clock: Arc<dyn Clock>,
    /// `None` = rutas sin autenticación
    pub verifier: Option<Arc<dyn TokenVerifier>>,
    pub redis: Option<RedisClient>,
}

impl AppState {
    pub fn new(
        config: EnvironmentConfig,
        directory: Arc<dyn ResourceDirectory>,
        predictor: Arc<TravelTimePredictor>,
        clock: Arc<dyn Clock>,
        verifier: Option<Arc<dyn TokenVerifier>>,
        redis: Option<RedisClient>,
    ) -> Self {
        let engine = Arc::new(DispatchAssignmentEngine::new(
            directory.clone(),
            predictor.clone(),
            clock.clone(),
            EngineConfig {
                max_radius_km: config.max_search_radius_km,
                ..EngineConfig::default()
            },
        ));
        let lifecycle = Arc::new(DispatchLifecycle::new(
            directory.clone(),
            engine.clone(),
            clock.clone(),
        ));
        let fleet = Arc::new(FleetService::new(directory.clone(), clock.clone()));

        Self {
            config: Arc::new(config),
            directory,
            engine,
            lifecycle,
            fleet,
            predictor,
            clock,
            verifier,
            redis,
        }
    }

    /// Redis como cache genérico, si está configurado
    pub fn cache(&self) -> Option<Arc<dyn CacheOperations>> {
        self.redis
            .clone()
            .map(|client| Arc::new(client) as Arc<dyn CacheOperations>)
    }
}
