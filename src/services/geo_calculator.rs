//! Cálculos geoespaciales
//!
//! Matemática pura sobre coordenadas: distancia de gran círculo (haversine),
//! búsqueda del más cercano, ranking por distancia, contención en radio y
//! estimación de tiempo de viaje. Sin I/O; las entradas inválidas devuelven
//! `None`/0/`false` en lugar de error.

use serde::Serialize;

use crate::models::geo::{DistanceUnit, GeoPoint};
use crate::models::vehicle::Vehicle;

/// Radio medio de la Tierra en metros (IUGG)
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Velocidad urbana por defecto en km/h
pub const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Algo con posición conocida (o desconocida)
pub trait Located {
    fn location(&self) -> Option<GeoPoint>;
}

impl Located for GeoPoint {
    fn location(&self) -> Option<GeoPoint> {
        Some(*self)
    }
}

impl Located for Vehicle {
    fn location(&self) -> Option<GeoPoint> {
        self.position()
    }
}

impl<T: Located> Located for &T {
    fn location(&self) -> Option<GeoPoint> {
        (*self).location()
    }
}

/// Candidato anotado con su distancia al origen
#[derive(Debug, Clone, Serialize)]
pub struct Ranked<T> {
    pub candidate: T,
    pub distance_km: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct GeoCalculator;

impl GeoCalculator {
    /// Distancia haversine en la unidad pedida, redondeada a 2 decimales
    pub fn distance(p1: GeoPoint, p2: GeoPoint, unit: DistanceUnit) -> f64 {
        if p1 == p2 {
            return 0.0;
        }
        round2(Self::distance_meters(p1, p2) / unit.meters())
    }

    pub fn distance_km(p1: GeoPoint, p2: GeoPoint) -> f64 {
        Self::distance(p1, p2, DistanceUnit::Km)
    }

    fn distance_meters(p1: GeoPoint, p2: GeoPoint) -> f64 {
        let lat1 = p1.latitude.to_radians();
        let lat2 = p2.latitude.to_radians();
        let d_lat = (p2.latitude - p1.latitude).to_radians();
        let d_lng = (p2.longitude - p1.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_MEAN_RADIUS_M * c
    }

    /// Suma de tramos consecutivos; 0 con menos de dos puntos
    pub fn route_distance(points: &[GeoPoint], unit: DistanceUnit) -> f64 {
        if points.len() < 2 {
            return 0.0;
        }
        let meters: f64 = points
            .windows(2)
            .map(|pair| Self::distance_meters(pair[0], pair[1]))
            .sum();
        round2(meters / unit.meters())
    }

    /// Candidato más cercano; en empate gana el primero encontrado.
    /// Los candidatos sin posición se ignoran.
    pub fn nearest<T: Located>(origin: GeoPoint, candidates: &[T]) -> Option<Ranked<&T>> {
        let mut best: Option<Ranked<&T>> = None;
        for candidate in candidates {
            let Some(position) = candidate.location() else {
                continue;
            };
            let distance_km = Self::distance_km(origin, position);
            if best.as_ref().map_or(true, |b| distance_km < b.distance_km) {
                best = Some(Ranked {
                    candidate,
                    distance_km,
                });
            }
        }
        best
    }

    /// Orden ascendente estable por distancia
    pub fn rank_by_distance<T: Located>(origin: GeoPoint, candidates: &[T]) -> Vec<Ranked<&T>> {
        let mut ranked: Vec<Ranked<&T>> = candidates
            .iter()
            .filter_map(|candidate| {
                candidate.location().map(|position| Ranked {
                    candidate,
                    distance_km: Self::distance_km(origin, position),
                })
            })
            .collect();
        ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        ranked
    }

    pub fn within_radius(origin: GeoPoint, point: GeoPoint, radius_km: f64) -> bool {
        Self::distance_km(origin, point) <= radius_km
    }

    /// Media aritmética de latitud y longitud; solo para puntos cercanos
    pub fn midpoint(p1: GeoPoint, p2: GeoPoint) -> GeoPoint {
        GeoPoint::new(
            (p1.latitude + p2.latitude) / 2.0,
            (p1.longitude + p2.longitude) / 2.0,
        )
    }

    pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
        lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng)
    }

    /// Minutos enteros (techo); 0 si alguna entrada no es positiva
    pub fn estimate_travel_time(distance_km: f64, avg_speed_kmh: f64) -> i32 {
        if !(distance_km > 0.0) || !(avg_speed_kmh > 0.0) {
            return 0;
        }
        let minutes = (distance_km / avg_speed_kmh * 60.0).ceil();
        if minutes >= i32::MAX as f64 {
            i32::MAX
        } else {
            minutes as i32
        }
    }

    /// Formato grados/minutos/segundos con hemisferio, p. ej. `16° 30' 0" S`
    pub fn format_dms(lat: f64, lng: f64) -> (String, String) {
        (
            Self::dms(lat, if lat >= 0.0 { 'N' } else { 'S' }),
            Self::dms(lng, if lng >= 0.0 { 'E' } else { 'W' }),
        )
    }

    fn dms(decimal: f64, hemisphere: char) -> String {
        let abs = decimal.abs();
        let degrees = abs.floor();
        let minutes = ((abs - degrees) * 60.0).floor();
        let seconds = round2(((abs - degrees) * 60.0 - minutes) * 60.0);
        format!("{}° {}' {}\" {}", degrees, minutes, seconds, hemisphere)
    }
}
