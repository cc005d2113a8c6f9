#![allow(dead_code)]

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ambulance_dispatch::clients::ml_client::{
    FeatureVector, ModelSuggestion, SuggestionQuery, TravelTimeModel,
};
use ambulance_dispatch::models::crew::{CrewMember, CrewRole, NewCrewMember};
use ambulance_dispatch::models::dispatch::{Dispatch, DispatchStatus, NewDispatch};
use ambulance_dispatch::models::geo::GeoPoint;
use ambulance_dispatch::models::vehicle::{NewVehicle, Vehicle, VehicleCategory};
use ambulance_dispatch::repositories::{InMemoryResourceDirectory, ResourceDirectory};
use ambulance_dispatch::services::assignment_service::{DispatchAssignmentEngine, EngineConfig};
use ambulance_dispatch::services::dispatch_lifecycle::DispatchLifecycle;
use ambulance_dispatch::services::fleet_service::FleetService;
use ambulance_dispatch::services::travel_time_predictor::{PredictorConfig, TravelTimePredictor};
use ambulance_dispatch::utils::clock::{Clock, FixedClock};

/// Centro de La Paz
pub const ORIGIN: GeoPoint = GeoPoint {
    latitude: -16.5,
    longitude: -68.15,
};

/// Lunes 10 de marzo de 2025, 11:00 hora local (UTC-4)
pub fn start_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap()
}

/// Modelo de tiempos configurable: `None` simula un servicio caído
#[derive(Default)]
pub struct StubModel {
    minutes: Mutex<Option<f64>>,
    suggestion: Mutex<Option<ModelSuggestion>>,
    pub predict_calls: AtomicUsize,
    pub feedback_calls: AtomicUsize,
}

impl StubModel {
    pub fn answering(minutes: f64) -> Self {
        let model = Self::default();
        model.set(Some(minutes));
        model
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn set(&self, minutes: Option<f64>) {
        *self.minutes.lock().unwrap() = minutes;
    }

    /// Respuesta del optimizador; `None` lo deja sin servicio
    pub fn suggest(&self, suggestion: Option<ModelSuggestion>) {
        *self.suggestion.lock().unwrap() = suggestion;
    }

    pub fn feedback_count(&self) -> usize {
        self.feedback_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TravelTimeModel for StubModel {
    async fn predict(&self, _features: &FeatureVector) -> Result<f64> {
        self.predict_calls.fetch_add(1, Ordering::SeqCst);
        (*self.minutes.lock().unwrap()).ok_or_else(|| anyhow!("model offline"))
    }

    async fn predict_batch(&self, features: &[FeatureVector]) -> Result<Vec<f64>> {
        let minutes = (*self.minutes.lock().unwrap()).ok_or_else(|| anyhow!("model offline"))?;
        Ok(vec![minutes; features.len()])
    }

    async fn health(&self) -> bool {
        self.minutes.lock().unwrap().is_some()
    }

    async fn feedback(&self, _payload: &serde_json::Value) -> Result<()> {
        self.feedback_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn evaluate(&self) -> Result<serde_json::Value> {
        self.minutes
            .lock()
            .unwrap()
            .map(|_| serde_json::json!({ "mse": 1.8, "r2_score": 0.91 }))
            .ok_or_else(|| anyhow!("model offline"))
    }

    async fn suggest_vehicle(&self, _query: &SuggestionQuery) -> Result<ModelSuggestion> {
        self.suggestion
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("optimizer offline"))
    }
}

pub struct Harness {
    pub directory: Arc<InMemoryResourceDirectory>,
    pub clock: Arc<FixedClock>,
    pub model: Arc<StubModel>,
    pub predictor: Arc<TravelTimePredictor>,
    pub engine: Arc<DispatchAssignmentEngine>,
    pub lifecycle: Arc<DispatchLifecycle>,
    pub fleet: Arc<FleetService>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_model(StubModel::answering(7.2))
    }

    pub fn with_model(model: StubModel) -> Self {
        let directory = Arc::new(InMemoryResourceDirectory::new());
        let clock = Arc::new(FixedClock::new(start_instant()));
        let model = Arc::new(model);
        let predictor = Arc::new(TravelTimePredictor::new(
            model.clone(),
            None,
            clock.clone(),
            PredictorConfig::default(),
        ));
        let engine = Arc::new(DispatchAssignmentEngine::new(
            directory.clone(),
            predictor.clone(),
            clock.clone(),
            EngineConfig::default(),
        ));
        let lifecycle = Arc::new(DispatchLifecycle::new(
            directory.clone(),
            engine.clone(),
            clock.clone(),
        ));
        let fleet = Arc::new(FleetService::new(directory.clone(), clock.clone()));

        Self {
            directory,
            clock,
            model,
            predictor,
            engine,
            lifecycle,
            fleet,
        }
    }

    pub async fn vehicle_at(&self, plate: &str, category: VehicleCategory, lat: f64, lng: f64) -> Vehicle {
        self.fleet
            .register_vehicle(NewVehicle {
                plate: plate.to_string(),
                model: "Toyota Hiace".to_string(),
                category,
                position: Some(GeoPoint::new(lat, lng)),
            })
            .await
            .unwrap()
    }

    pub async fn crew(&self, name: &str, role: CrewRole, experience_years: i32) -> CrewMember {
        self.fleet
            .register_crew_member(NewCrewMember {
                first_name: name.to_string(),
                last_name: "Mamani".to_string(),
                national_id: format!("{}-{}", name, experience_years),
                role,
                specialty: None,
                experience_years,
                phone: None,
                email: None,
            })
            .await
            .unwrap()
    }

    /// Despacho registrado sin recursos, en `pending`
    pub async fn pending_dispatch(&self, origin: GeoPoint) -> Dispatch {
        let mut tx = self.directory.begin().await.unwrap();
        let dispatch = tx
            .create_dispatch(&NewDispatch {
                request_ref: Some(77),
                vehicle_id: None,
                origin,
                origin_address: Some("Av. 16 de Julio".to_string()),
                destination: None,
                destination_address: None,
                distance_km: None,
                estimated_minutes: None,
                status: DispatchStatus::Pending,
                priority: Default::default(),
                incident: Default::default(),
                notes: None,
                supplementary: None,
                requested_at: self.clock.now(),
                assigned_at: None,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        dispatch
    }

    /// Una ambulancia básica junto al origen, un conductor y un paramédico
    pub async fn seed_minimal(&self) -> (Vehicle, CrewMember, CrewMember) {
        let vehicle = self
            .vehicle_at("1001-LPZ", VehicleCategory::Basic, -16.501, -68.15)
            .await;
        let driver = self.crew("Juan", CrewRole::Driver, 5).await;
        let paramedic = self.crew("Ana", CrewRole::Paramedic, 4).await;
        (vehicle, driver, paramedic)
    }
}
