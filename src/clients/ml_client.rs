//! Cliente HTTP del servicio de predicción de tiempos de viaje
//!
//! El servicio expone `/predict`, `/predict/batch`, `/health`, `/feedback`,
//! `/evaluate` y `/api/v1/optimize-dispatch`. Los nombres de campo en el
//! cable son los del servicio ML existente.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Vector de características de una predicción
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    #[serde(rename = "distancia")]
    pub distance_km: f64,
    #[serde(rename = "hora_dia")]
    pub hour_of_day: u32,
    /// 0 = domingo
    #[serde(rename = "dia_semana")]
    pub day_of_week: u32,
    #[serde(rename = "tipo_ambulancia")]
    pub vehicle_category_code: u8,
    #[serde(rename = "trafico_estimado")]
    pub traffic_factor: f64,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(alias = "tiempo_estimado", alias = "estimatedMinutes")]
    estimated_minutes: f64,
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    #[serde(rename = "predicciones")]
    predictions: &'a [FeatureVector],
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(alias = "resultados")]
    results: Vec<f64>,
}

/// Datos de un despacho para pedir una ambulancia sugerida
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionQuery {
    #[serde(rename = "despacho_id")]
    pub dispatch_id: i64,
    #[serde(rename = "ubicacion_origen_lat")]
    pub origin_lat: f64,
    #[serde(rename = "ubicacion_origen_lng")]
    pub origin_lng: f64,
    #[serde(rename = "ubicacion_destino_lat", skip_serializing_if = "Option::is_none")]
    pub destination_lat: Option<f64>,
    #[serde(rename = "ubicacion_destino_lng", skip_serializing_if = "Option::is_none")]
    pub destination_lng: Option<f64>,
    #[serde(rename = "prioridad")]
    pub priority: String,
}

/// Respuesta del optimizador de despachos
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelSuggestion {
    #[serde(alias = "ambulancia_id")]
    pub vehicle_id: Option<i64>,
    #[serde(alias = "confianza", default)]
    pub confidence: f64,
    #[serde(alias = "tiempo_estimado_min")]
    pub estimated_minutes: Option<i32>,
    pub distance_km: Option<f64>,
    #[serde(alias = "razon")]
    pub reason: Option<String>,
}

/// Modelo externo de tiempos de viaje
#[async_trait::async_trait]
pub trait TravelTimeModel: Send + Sync {
    async fn predict(&self, features: &FeatureVector) -> Result<f64>;
    async fn predict_batch(&self, features: &[FeatureVector]) -> Result<Vec<f64>>;
    async fn health(&self) -> bool;
    async fn feedback(&self, payload: &serde_json::Value) -> Result<()>;

    /// Métricas de precisión del modelo, tal como las reporta el servicio
    async fn evaluate(&self) -> Result<serde_json::Value> {
        Err(anyhow!("model evaluation is not supported"))
    }

    async fn suggest_vehicle(&self, _query: &SuggestionQuery) -> Result<ModelSuggestion> {
        Err(anyhow!("dispatch suggestions are not supported"))
    }
}

pub struct HttpTravelTimeModel {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTravelTimeModel {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait::async_trait]
impl TravelTimeModel for HttpTravelTimeModel {
    async fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let response = self
            .client
            .post(self.url("/predict"))
            .json(features)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("ML service answered {}", status));
        }

        let body: PredictResponse = response.json().await?;
        Ok(body.estimated_minutes)
    }

    async fn predict_batch(&self, features: &[FeatureVector]) -> Result<Vec<f64>> {
        let response = self
            .client
            .post(self.url("/predict/batch"))
            .timeout(self.timeout * 2)
            .json(&BatchRequest {
                predictions: features,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("ML service answered {}", status));
        }

        let body: BatchResponse = response.json().await?;
        if body.results.len() != features.len() {
            return Err(anyhow!(
                "ML batch returned {} results for {} requests",
                body.results.len(),
                features.len()
            ));
        }
        Ok(body.results)
    }

    async fn health(&self) -> bool {
        match self
            .client
            .get(self.url("/health"))
            .timeout(self.timeout.min(Duration::from_secs(5)))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("ML health check failed: {}", e);
                false
            }
        }
    }

    async fn feedback(&self, payload: &serde_json::Value) -> Result<()> {
        let response = self
            .client
            .post(self.url("/feedback"))
            .json(payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("ML feedback answered {}", response.status()));
        }
        Ok(())
    }

    async fn evaluate(&self) -> Result<serde_json::Value> {
        let response = self.client.get(self.url("/evaluate")).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("ML evaluation answered {}", status));
        }
        Ok(response.json().await?)
    }

    async fn suggest_vehicle(&self, query: &SuggestionQuery) -> Result<ModelSuggestion> {
        let response = self
            .client
            .get(self.url("/api/v1/optimize-dispatch"))
            .query(query)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("ML optimizer answered {}", status));
        }
        Ok(response.json().await?)
    }
}
