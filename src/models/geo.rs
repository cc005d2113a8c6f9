//! Coordenadas geográficas

use serde::{Deserialize, Serialize};

/// Punto geográfico en grados decimales (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Construye un punto a partir de columnas anulables
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lng)) => Some(Self::new(lat, lng)),
            _ => None,
        }
    }
}

/// Unidad de distancia soportada por el calculador
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Km,
    M,
    Mile,
}

impl DistanceUnit {
    /// Metros por unidad
    pub fn meters(self) -> f64 {
        match self {
            DistanceUnit::Km => 1000.0,
            DistanceUnit::M => 1.0,
            DistanceUnit::Mile => 1609.344,
        }
    }
}
