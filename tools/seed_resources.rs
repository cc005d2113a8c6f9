//! Carga una flota de ejemplo (La Paz) y su personal en la base configurada
//!
//! Uso: `DATABASE_URL=postgres://... cargo run --bin seed_resources`

use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ambulance_dispatch::config::{DatabaseConfig, EnvironmentConfig};
use ambulance_dispatch::database::DatabaseConnection;
use ambulance_dispatch::models::crew::{CrewRole, NewCrewMember};
use ambulance_dispatch::models::geo::GeoPoint;
use ambulance_dispatch::models::vehicle::{NewVehicle, VehicleCategory};
use ambulance_dispatch::repositories::PgResourceDirectory;
use ambulance_dispatch::services::fleet_service::FleetService;
use ambulance_dispatch::utils::clock::SystemClock;

const VEHICLES: &[(&str, &str, VehicleCategory, f64, f64)] = &[
    ("2345-LPZ", "Toyota Hiace", VehicleCategory::Basic, -16.4955, -68.1336),
    ("3456-LPZ", "Toyota Hiace", VehicleCategory::Basic, -16.5204, -68.1124),
    ("4567-LPZ", "Nissan Urvan", VehicleCategory::Intermediate, -16.5101, -68.1250),
    ("5678-LPZ", "Mercedes Sprinter", VehicleCategory::Advanced, -16.5389, -68.0868),
    ("6789-LPZ", "Mercedes Sprinter", VehicleCategory::CriticalCare, -16.5000, -68.1500),
    ("7890-EAL", "Ford Transit", VehicleCategory::Intermediate, -16.5050, -68.1630),
];

const CREW: &[(&str, &str, &str, CrewRole, Option<&str>, i32)] = &[
    ("Juan", "Mamani", "4812345", CrewRole::Driver, None, 12),
    ("Carlos", "Quispe", "5923456", CrewRole::Driver, None, 7),
    ("Rosa", "Choque", "6034567", CrewRole::Driver, None, 3),
    ("Ana", "Flores", "4145678", CrewRole::Paramedic, None, 9),
    ("Luis", "Condori", "5256789", CrewRole::Paramedic, None, 5),
    ("María", "Gutiérrez", "6367890", CrewRole::Paramedic, None, 2),
    ("Patricia", "Vargas", "3478901", CrewRole::Physician, Some("Emergenciología"), 15),
    ("Jorge", "Rojas", "3589012", CrewRole::Physician, Some("Medicina interna"), 8),
    ("Elena", "Apaza", "4690123", CrewRole::Nurse, Some("Cuidados intensivos"), 10),
    ("Sofía", "Limachi", "5701234", CrewRole::Nurse, None, 4),
];

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EnvironmentConfig::from_env();
    let url = config
        .database_url
        .ok_or_else(|| anyhow!("DATABASE_URL is required to seed resources"))?;

    let connection = DatabaseConnection::connect(&DatabaseConfig::new(url)).await?;
    let directory = Arc::new(PgResourceDirectory::new(connection.pool().clone()));
    let fleet = FleetService::new(directory, Arc::new(SystemClock));

    info!("🌱 Cargando {} ambulancias", VEHICLES.len());
    for (plate, model, category, lat, lng) in VEHICLES {
        let vehicle = NewVehicle {
            plate: plate.to_string(),
            model: model.to_string(),
            category: *category,
            position: Some(GeoPoint::new(*lat, *lng)),
        };
        if let Err(e) = fleet.register_vehicle(vehicle).await {
            warn!("⚠️ No se pudo registrar {}: {}", plate, e);
        }
    }

    info!("🌱 Cargando {} tripulantes", CREW.len());
    for (first_name, last_name, national_id, role, specialty, experience_years) in CREW {
        let member = NewCrewMember {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            national_id: national_id.to_string(),
            role: *role,
            specialty: specialty.map(str::to_string),
            experience_years: *experience_years,
            phone: None,
            email: None,
        };
        if let Err(e) = fleet.register_crew_member(member).await {
            warn!("⚠️ No se pudo registrar {} {}: {}", first_name, last_name, e);
        }
    }

    info!("✅ Datos de ejemplo cargados");
    Ok(())
}
