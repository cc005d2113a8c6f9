//! Clients - HTTP Clients for External APIs
//!
//! This module contains HTTP clients for communicating with external APIs.

pub mod ml_client;

pub use ml_client::{FeatureVector, HttpTravelTimeModel, TravelTimeModel};
