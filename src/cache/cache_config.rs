//! Configuración de cache
//!
//! Este módulo contiene la configuración y el contrato de operaciones del
//! sistema de cache.

use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

/// Configuración del cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: String,
    pub default_ttl: u64,
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            default_ttl: 3600, // 1 hora
            key_prefix: "ms_despacho".to_string(),
        }
    }
}

impl CacheConfig {
    /// Generar clave de cache con prefijo
    pub fn make_key(&self, prefix: &str, identifier: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, prefix, identifier)
    }
}

/// Operaciones de cache sobre valores serializados.
///
/// Las implementaciones absorben sus propios errores de lectura: un fallo
/// del backend se reporta como MISS.
#[async_trait::async_trait]
pub trait CacheOperations: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;
    async fn set_raw(&self, key: &str, value: String, ttl: u64) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn is_connected(&self) -> bool;
}

/// Acceso tipado (JSON) sobre cualquier `CacheOperations`
#[async_trait::async_trait]
pub trait CacheExt: CacheOperations {
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key).await? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    debug!("🗑️ Valor de cache ilegible para clave {}: {}", key, e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: u64) -> Result<()> {
        let serialized = serde_json::to_string(value)?;
        self.set_raw(key, serialized, ttl).await
    }
}

impl<C: CacheOperations + ?Sized> CacheExt for C {}
