//! Proyecciones de solo lectura: disponibilidad y estadísticas

use serde::Serialize;
use std::collections::BTreeMap;

/// Conteos de recursos por estado y categoría/rol
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AvailabilitySnapshot {
    pub vehicles: ResourceCounts,
    pub crew: ResourceCounts,
    pub active_dispatches: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceCounts {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    /// Categoría para vehículos, rol para personal
    pub by_kind: BTreeMap<String, i64>,
}

impl ResourceCounts {
    pub fn available(&self) -> i64 {
        self.by_status.get("available").copied().unwrap_or(0)
    }

    pub fn in_service(&self) -> i64 {
        self.by_status.get("in_service").copied().unwrap_or(0)
    }
}

/// Estadísticas de despachos en una ventana de horas
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchStatistics {
    pub window_hours: i64,
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_priority: BTreeMap<String, i64>,
    /// Porcentaje de completados sobre el total, redondeado a 2 decimales
    pub completion_rate: f64,
}

impl DispatchStatistics {
    pub fn completion_rate_of(completed: i64, total: i64) -> f64 {
        if total <= 0 {
            return 0.0;
        }
        ((completed as f64 / total as f64) * 100.0 * 100.0).round() / 100.0
    }
}
