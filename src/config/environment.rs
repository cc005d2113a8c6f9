//! Configuración de variables de entorno
//!
//! Este módulo lee la configuración del servicio desde el entorno (y `.env`).
//! Todas las variables tienen un valor por defecto salvo `DATABASE_URL`;
//! un valor numérico inválido se ignora con una advertencia.

use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub ml_service_url: String,
    pub ml_timeout: Duration,
    pub ml_cache_ttl_secs: u64,
    pub local_utc_offset_hours: i32,
    pub auth_service_url: Option<String>,
    pub auth_verify_endpoint: String,
    pub auth_timeout: Duration,
    pub auth_cache_ttl_secs: u64,
    pub event_channel: String,
    pub outbox_poll_interval: Duration,
    pub outbox_batch_size: i64,
    pub outbox_max_attempts: i32,
    /// Antigüedad a partir de la cual se borran los eventos entregados
    pub outbox_retention: Duration,
    pub max_search_radius_km: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8001,
            database_url: None,
            redis_url: None,
            cors_origins: Vec::new(),
            ml_service_url: "http://localhost:5000".to_string(),
            ml_timeout: Duration::from_secs(5),
            ml_cache_ttl_secs: 3600,
            local_utc_offset_hours: -4,
            auth_service_url: None,
            auth_verify_endpoint: "/api/verify-token".to_string(),
            auth_timeout: Duration::from_secs(5),
            auth_cache_ttl_secs: 300,
            event_channel: "dispatch:events".to_string(),
            outbox_poll_interval: Duration::from_millis(1000),
            outbox_batch_size: 50,
            outbox_max_attempts: 8,
            outbox_retention: Duration::from_secs(24 * 3600),
            max_search_radius_km: 50.0,
        }
    }
}

fn text(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    match text(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("⚠️ {}='{}' no es válido, usando el valor por defecto", key, raw);
            default
        }),
    }
}

impl EnvironmentConfig {
    /// Lee la configuración del entorno actual
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            environment: text("ENVIRONMENT").unwrap_or(defaults.environment),
            host: text("HOST").unwrap_or(defaults.host),
            port: parsed("PORT", defaults.port),
            database_url: text("DATABASE_URL"),
            redis_url: text("REDIS_URL"),
            cors_origins: text("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            ml_service_url: text("ML_SERVICE_URL").unwrap_or(defaults.ml_service_url),
            ml_timeout: Duration::from_secs(parsed("ML_SERVICE_TIMEOUT_SECS", 5)),
            ml_cache_ttl_secs: parsed("ML_CACHE_TTL_SECS", defaults.ml_cache_ttl_secs),
            local_utc_offset_hours: parsed("LOCAL_UTC_OFFSET_HOURS", defaults.local_utc_offset_hours),
            auth_service_url: text("AUTH_SERVICE_URL"),
            auth_verify_endpoint: text("AUTH_VERIFY_ENDPOINT").unwrap_or(defaults.auth_verify_endpoint),
            auth_timeout: Duration::from_secs(parsed("AUTH_TIMEOUT_SECS", 5)),
            auth_cache_ttl_secs: parsed("AUTH_CACHE_TTL_SECS", defaults.auth_cache_ttl_secs),
            event_channel: text("EVENT_CHANNEL").unwrap_or(defaults.event_channel),
            outbox_poll_interval: Duration::from_millis(parsed("OUTBOX_POLL_INTERVAL_MS", 1000)),
            outbox_batch_size: parsed("OUTBOX_BATCH_SIZE", defaults.outbox_batch_size),
            outbox_max_attempts: parsed("OUTBOX_MAX_ATTEMPTS", defaults.outbox_max_attempts),
            outbox_retention: Duration::from_secs(parsed("OUTBOX_RETENTION_HOURS", 24u64) * 3600),
            max_search_radius_km: parsed("MAX_SEARCH_RADIUS_KM", defaults.max_search_radius_km),
        }
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
