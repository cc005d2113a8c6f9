//! Servicio de despacho de ambulancias
//!
//! Asigna la ambulancia disponible más cercana y su tripulación a cada
//! solicitud de emergencia, sigue el ciclo de vida del despacho y publica
//! los cambios de estado a través de un outbox transaccional.

pub mod cache;
pub mod clients;
pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_api_router;
pub use state::AppState;
