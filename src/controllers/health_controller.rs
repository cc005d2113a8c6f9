//! Health checks del servicio y de sus dependencias

use serde::Serialize;

use crate::cache::CacheOperations;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ServiceCheck {
    pub name: &'static str,
    pub healthy: bool,
}

#[derive(Debug, Serialize)]
pub struct ServicesHealth {
    pub status: &'static str,
    pub services: Vec<ServiceCheck>,
}

impl ServicesHealth {
    pub fn is_healthy(&self) -> bool {
        self.services.iter().all(|check| check.healthy)
    }
}

pub struct HealthController {
    state: AppState,
}

impl HealthController {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
        }
    }

    /// Ping del almacén de recursos
    pub async fn store_ok(&self) -> bool {
        self.state.directory.ping().await
    }

    /// Métricas de precisión del modelo de tiempos de viaje
    pub async fn model_evaluation(&self) -> Option<serde_json::Value> {
        self.state.predictor.evaluation().await
    }

    /// Estado de cada dependencia; `degraded` si alguna no responde
    pub async fn services(&self) -> ServicesHealth {
        let (store_ok, model_ok) = futures::join!(
            self.state.directory.ping(),
            self.state.predictor.is_available()
        );
        let mut services = vec![
            ServiceCheck {
                name: "resource_directory",
                healthy: store_ok,
            },
            ServiceCheck {
                name: "travel_time_model",
                healthy: model_ok,
            },
        ];
        if let Some(verifier) = &self.state.verifier {
            services.push(ServiceCheck {
                name: "auth_service",
                healthy: verifier.is_available().await,
            });
        }
        if let Some(redis) = &self.state.redis {
            services.push(ServiceCheck {
                name: "redis",
                healthy: redis.is_connected().await,
            });
        }

        let mut report = ServicesHealth {
            status: "healthy",
            services,
        };
        if !report.is_healthy() {
            report.status = "degraded";
        }
        report
    }
}
