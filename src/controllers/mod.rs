pub mod crew_controller;
pub mod dispatch_controller;
pub mod health_controller;
pub mod vehicle_controller;
