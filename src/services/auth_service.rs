//! Verificación de tokens contra el servicio de autenticación
//!
//! El resultado de una verificación exitosa se cachea 5 minutos bajo
//! `auth_token:{md5(token)}`. Cualquier fallo (timeout, 5xx, respuesta
//! ilegible) cuenta como token inválido.

use anyhow::{anyhow, Result};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheExt, CacheOperations};

/// Identidad devuelta por el servicio de autenticación
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    /// `None` si el token no es válido o no se pudo verificar
    async fn verify(&self, token: &str) -> Option<AuthUser>;

    async fn is_available(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    pub base_url: String,
    pub verify_endpoint: String,
    pub timeout: Duration,
    pub cache_ttl_secs: u64,
}

impl Default for AuthServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8003".to_string(),
            verify_endpoint: "/api/verify-token".to_string(),
            timeout: Duration::from_secs(5),
            cache_ttl_secs: 300,
        }
    }
}

pub struct HttpTokenVerifier {
    client: Client,
    config: AuthServiceConfig,
    cache: Option<Arc<dyn CacheOperations>>,
}

impl HttpTokenVerifier {
    pub fn new(config: AuthServiceConfig, cache: Option<Arc<dyn CacheOperations>>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;
        Ok(Self {
            client,
            config,
            cache,
        })
    }

    pub fn cache_key(token: &str) -> String {
        format!("auth_token:{:x}", md5::compute(token))
    }

    async fn call_service(&self, token: &str) -> Result<Option<AuthUser>> {
        let url = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.verify_endpoint
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(Some(response.json::<AuthUser>().await?)),
            StatusCode::UNAUTHORIZED => Ok(None),
            status => Err(anyhow!("auth service responded {}", status)),
        }
    }
}

#[async_trait::async_trait]
impl TokenVerifier for HttpTokenVerifier {
    async fn verify(&self, token: &str) -> Option<AuthUser> {
        let key = Self::cache_key(token);
        if let Some(cache) = &self.cache {
            match cache.get::<AuthUser>(&key).await {
                Ok(Some(user)) => {
                    debug!("Token verificado desde cache");
                    return Some(user);
                }
                Ok(None) => {}
                Err(e) => debug!("Cache no disponible, continuando sin cache: {}", e),
            }
        }

        match self.call_service(token).await {
            Ok(Some(user)) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.set(&key, &user, self.config.cache_ttl_secs).await {
                        debug!("No se pudo cachear el token: {}", e);
                    }
                }
                info!(user_id = ?user.id, "🔐 Token verificado exitosamente");
                Some(user)
            }
            Ok(None) => {
                warn!("Token inválido o expirado");
                None
            }
            Err(e) => {
                error!("❌ Error al verificar token: {}", e);
                None
            }
        }
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/health", self.config.base_url.trim_end_matches('/'));
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Servicio de autenticación no disponible: {}", e);
                false
            }
        }
    }
}

/// Verificador fijo para pruebas: un único token válido
pub struct StaticTokenVerifier {
    token: String,
    user: AuthUser,
}

impl StaticTokenVerifier {
    pub fn new(token: impl Into<String>, user: AuthUser) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }
}

#[async_trait::async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Option<AuthUser> {
        (token == self.token).then(|| self.user.clone())
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[test]
    fn test_cache_key_hides_token() {
        let key = HttpTokenVerifier::cache_key("secret-token");
        assert!(key.starts_with("auth_token:"));
        assert!(!key.contains("secret-token"));
        assert_eq!(key.len(), "auth_token:".len() + 32);
    }

    #[tokio::test]
    async fn test_unreachable_service_means_invalid() {
        let verifier = HttpTokenVerifier::new(
            AuthServiceConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                timeout: Duration::from_millis(200),
                ..AuthServiceConfig::default()
            },
            None,
        )
        .unwrap();
        assert_eq!(verifier.verify("whatever").await, None);
        assert!(!verifier.is_available().await);
    }

    #[tokio::test]
    async fn test_cached_identity_skips_service() {
        let cache = Arc::new(MemoryCache::new());
        let user = AuthUser {
            id: Some(7),
            email: Some("operador@sem.bo".into()),
            role: Some("operator".into()),
        };
        cache
            .set(&HttpTokenVerifier::cache_key("tok"), &user, 300)
            .await
            .unwrap();
        let verifier = HttpTokenVerifier::new(
            AuthServiceConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                ..AuthServiceConfig::default()
            },
            Some(cache),
        )
        .unwrap();
        assert_eq!(verifier.verify("tok").await, Some(user));
    }
}
