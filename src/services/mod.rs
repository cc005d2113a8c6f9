//! Services module
//!
//! Este módulo contiene la lógica de negocio del despacho: cálculo
//! geoespacial, predicción de tiempos, asignación de recursos, ciclo de
//! vida, operaciones de flota, entrega de eventos y verificación de tokens.

pub mod assignment_service;
pub mod auth_service;
pub mod dispatch_lifecycle;
pub mod event_notifier;
pub mod fleet_service;
pub mod geo_calculator;
pub mod outbox_relay;
pub mod travel_time_predictor;

pub use assignment_service::{
    CrewReservation, DispatchAssignmentEngine, DispatchOutcome, DispatchRequest, EngineConfig,
    VehicleMatch,
};
pub use auth_service::{AuthServiceConfig, AuthUser, HttpTokenVerifier, TokenVerifier};
pub use dispatch_lifecycle::{DispatchDetails, DispatchFeedback, DispatchLifecycle};
pub use event_notifier::{EventNotifier, LogEventNotifier, RecordingNotifier, RedisEventNotifier};
pub use fleet_service::FleetService;
pub use geo_calculator::GeoCalculator;
pub use outbox_relay::{OutboxRelay, RelayConfig, RelayStats};
pub use travel_time_predictor::{PredictorConfig, TravelTimePredictor};
