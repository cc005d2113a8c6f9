//! Modelo de Vehicle (ambulancia)
//!
//! Mapea la tabla `vehicles`. La categoría y el estado son enums cerrados
//! que se corresponden con los tipos ENUM de PostgreSQL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt;
use std::str::FromStr;

use super::geo::GeoPoint;

/// Nivel de servicio del vehículo - mapea al ENUM vehicle_category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[sqlx(type_name = "vehicle_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VehicleCategory {
    Basic,
    Intermediate,
    Advanced,
    CriticalCare,
}

impl VehicleCategory {
    pub const ALL: [VehicleCategory; 4] = [
        VehicleCategory::Basic,
        VehicleCategory::Intermediate,
        VehicleCategory::Advanced,
        VehicleCategory::CriticalCare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleCategory::Basic => "basic",
            VehicleCategory::Intermediate => "intermediate",
            VehicleCategory::Advanced => "advanced",
            VehicleCategory::CriticalCare => "critical_care",
        }
    }

    /// Código numérico que espera el modelo de predicción
    pub fn model_code(&self) -> u8 {
        match self {
            VehicleCategory::Basic => 0,
            VehicleCategory::Intermediate => 1,
            VehicleCategory::Advanced => 2,
            VehicleCategory::CriticalCare => 3,
        }
    }
}

impl fmt::Display for VehicleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(VehicleCategory::Basic),
            "intermediate" => Ok(VehicleCategory::Intermediate),
            "advanced" => Ok(VehicleCategory::Advanced),
            "critical_care" => Ok(VehicleCategory::CriticalCare),
            other => Err(format!("unknown vehicle category '{}'", other)),
        }
    }
}

/// Estado del vehículo - mapea al ENUM vehicle_status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[sqlx(type_name = "vehicle_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Available,
    InService,
    Maintenance,
    OutOfService,
}

impl VehicleStatus {
    pub const ALL: [VehicleStatus; 4] = [
        VehicleStatus::Available,
        VehicleStatus::InService,
        VehicleStatus::Maintenance,
        VehicleStatus::OutOfService,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Available => "available",
            VehicleStatus::InService => "in_service",
            VehicleStatus::Maintenance => "maintenance",
            VehicleStatus::OutOfService => "out_of_service",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(VehicleStatus::Available),
            "in_service" => Ok(VehicleStatus::InService),
            "maintenance" => Ok(VehicleStatus::Maintenance),
            "out_of_service" => Ok(VehicleStatus::OutOfService),
            other => Err(format!("unknown vehicle status '{}'", other)),
        }
    }
}

/// Vehicle principal - mapea exactamente a la tabla vehicles
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: i64,
    pub plate: String,
    pub model: String,
    pub category: VehicleCategory,
    pub status: VehicleStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub position_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    /// Última posición conocida, si existe
    pub fn position(&self) -> Option<GeoPoint> {
        GeoPoint::from_parts(self.latitude, self.longitude)
    }

    pub fn is_available(&self) -> bool {
        self.status == VehicleStatus::Available
    }
}

/// Datos para registrar un vehículo nuevo
#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub plate: String,
    pub model: String,
    pub category: VehicleCategory,
    pub position: Option<GeoPoint>,
}

/// Filtros para búsqueda de vehículos
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehicleFilter {
    pub status: Option<VehicleStatus>,
    pub category: Option<VehicleCategory>,
}

impl VehicleFilter {
    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        self.status.map_or(true, |s| vehicle.status == s)
            && self.category.map_or(true, |c| vehicle.category == c)
    }
}
