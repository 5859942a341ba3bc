//! Run state with deterministic fingerprinting for replay validation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::events::Timestamp;
use crate::risk::RiskEngine;
use crate::state::TripConfig;

/// Literal starting point for one monitored part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSeed {
    pub name: String,
    pub initial_health: f64,
    /// Health fraction lost per 100 km on neutral terrain.
    pub degradation_rate: f64,
    pub warn_threshold: f64,
}

impl ComponentSeed {
    pub fn new(name: &str, initial_health: f64, degradation_rate: f64, warn_threshold: f64) -> Self {
        Self {
            name: name.to_string(),
            initial_health: clamp_pct(initial_health),
            degradation_rate: if degradation_rate.is_finite() { degradation_rate.max(0.0) } else { 0.0 },
            warn_threshold: clamp_pct(warn_threshold),
        }
    }
}

/// Immutable seed set handed to the simulator at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSeeds(Vec<ComponentSeed>);

impl ComponentSeeds {
    pub fn new(seeds: Vec<ComponentSeed>) -> Self {
        Self(seeds)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentSeed> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ComponentSeed> {
        self.0.iter().find(|s| s.name == name)
    }
}

impl Default for ComponentSeeds {
    fn default() -> Self {
        Self(vec![
            ComponentSeed::new("Front Brakes", 58.0, 0.08, 35.0),
            ComponentSeed::new("Rear Brakes", 78.0, 0.04, 40.0),
            ComponentSeed::new("Battery", 94.0, 0.01, 70.0),
            ComponentSeed::new("Tires", 72.0, 0.05, 40.0),
            ComponentSeed::new("Suspension", 85.0, 0.02, 50.0),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentState {
    pub name: String,
    pub initial_health: f64,
    pub current_health: f64,
    pub degradation_rate: f64,
    pub warn_threshold: f64,
}

impl ComponentState {
    /// Seeds built as struct literals or deserialized skip `ComponentSeed::new`,
    /// so they are clamped again here.
    pub fn from_seed(seed: &ComponentSeed) -> Self {
        let seed = ComponentSeed::new(&seed.name, seed.initial_health, seed.degradation_rate, seed.warn_threshold);
        Self {
            name: seed.name.clone(),
            initial_health: seed.initial_health,
            current_health: seed.initial_health,
            degradation_rate: seed.degradation_rate,
            warn_threshold: seed.warn_threshold,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.current_health <= self.warn_threshold
    }

    /// Health rounded the way it is displayed.
    pub fn display_health(&self) -> u8 {
        self.current_health.round().clamp(0.0, 100.0) as u8
    }
}

/// One simulated trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
    pub progress_pct: u8,
    pub components: Vec<ComponentState>,
    /// Component names in the order they first crossed their threshold.
    pub warnings: Vec<String>,
    pub running: bool,
}

impl SimulationRun {
    pub fn from_seeds(seeds: &ComponentSeeds) -> Self {
        Self {
            progress_pct: 0,
            components: seeds.iter().map(ComponentState::from_seed).collect(),
            warnings: Vec::new(),
            running: false,
        }
    }

    pub fn component(&self, name: &str) -> Option<&ComponentState> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn is_complete(&self) -> bool {
        self.progress_pct >= 100
    }

    pub fn distance_covered_km(&self, trip: &TripConfig) -> f64 {
        (self.progress_pct as f64 / 100.0) * trip.distance_km
    }

    /// SHA-256 over the run, health quantised to 1e-6 so float noise cannot split replays.
    pub fn fingerprint(&self) -> String {
        let mut h = Sha256::new();
        h.update([self.progress_pct, self.running as u8]);
        for c in &self.components {
            h.update(c.name.as_bytes());
            h.update(((c.current_health * 1e6).round() as i64).to_le_bytes());
        }
        for w in &self.warnings {
            h.update(w.as_bytes());
            h.update([0u8]);
        }
        hex::encode(h.finalize())
    }
}

/// Everything the reducer owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineState {
    /// Logical time of the last processed event
    pub now: Timestamp,
    pub seq: u64,
    pub trip: TripConfig,
    pub run: SimulationRun,
    /// Level last reported through a `RiskChanged` command
    pub risk: RiskEngine,
    pub timer_armed: bool,
}

impl EngineState {
    pub fn new(trip: TripConfig, run: SimulationRun) -> Self {
        Self {
            now: 0,
            seq: 0,
            trip,
            run,
            risk: RiskEngine::new(),
            timer_armed: false,
        }
    }

    pub fn hash(&self) -> String {
        self.run.fingerprint()
    }
}

fn clamp_pct(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_seeds() {
        let seeds = ComponentSeeds::default();
        assert_eq!(seeds.len(), 5);
        let brakes = seeds.get("Front Brakes").unwrap();
        assert_eq!(brakes.initial_health, 58.0);
        assert_eq!(brakes.degradation_rate, 0.08);
        assert_eq!(brakes.warn_threshold, 35.0);
        assert_eq!(seeds.get("Battery").unwrap().warn_threshold, 70.0);
    }

    #[test]
    fn test_seed_clamping() {
        let seed = ComponentSeed::new("Odd", 140.0, -0.5, -3.0);
        assert_eq!(seed.initial_health, 100.0);
        assert_eq!(seed.degradation_rate, 0.0);
        assert_eq!(seed.warn_threshold, 0.0);
    }

    #[test]
    fn test_run_from_seeds_is_fresh() {
        let run = SimulationRun::from_seeds(&ComponentSeeds::default());
        assert_eq!(run.progress_pct, 0);
        assert!(!run.running);
        assert!(run.warnings.is_empty());
        for c in &run.components {
            assert_eq!(c.current_health, c.initial_health);
        }
    }

    #[test]
    fn test_fingerprint_tracks_health() {
        let mut run = SimulationRun::from_seeds(&ComponentSeeds::default());
        let before = run.fingerprint();
        assert_eq!(before, run.clone().fingerprint());
        run.components[0].current_health -= 0.5;
        assert_ne!(before, run.fingerprint());
    }

    #[test]
    fn test_display_health_rounds() {
        let mut c = ComponentState::from_seed(&ComponentSeed::new("Front Brakes", 58.0, 0.08, 35.0));
        c.current_health = 38.992;
        assert_eq!(c.display_health(), 39);
        c.current_health = 38.4;
        assert_eq!(c.display_health(), 38);
    }
}
