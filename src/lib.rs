//! Trip simulator: projects component wear over a simulated drive.

pub mod controller;
pub mod engine;
pub mod logging;
pub mod presenter;
pub mod risk;
pub mod scheduler;
pub mod state;
pub mod verify;

pub use engine::state::{ComponentSeed, ComponentSeeds, ComponentState, SimulationRun};
pub use engine::stepper::{DegradationSimulator, DistanceBasis};
pub use risk::RiskLevel;
pub use state::{Terrain, TripConfig};
