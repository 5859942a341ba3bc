use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::engine::stepper::DistanceBasis;

pub const MIN_DISTANCE_KM: f64 = 50.0;
pub const MAX_DISTANCE_KM: f64 = 800.0;
pub const DEFAULT_DISTANCE_KM: f64 = 200.0;

/// Route type selected for a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    City,
    Highway,
    #[default]
    Mixed,
}

impl Terrain {
    pub const ALL: [Terrain; 3] = [Terrain::City, Terrain::Highway, Terrain::Mixed];

    pub fn multiplier(&self) -> f64 {
        match self {
            Terrain::City => 1.2,
            Terrain::Highway => 0.8,
            Terrain::Mixed => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Terrain::City => "city",
            Terrain::Highway => "highway",
            Terrain::Mixed => "mixed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Terrain::City => "City",
            Terrain::Highway => "Highway",
            Terrain::Mixed => "Mixed",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Terrain::City => "Urban",
            Terrain::Highway => "Interstate",
            Terrain::Mixed => "Combined",
        }
    }
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Terrain {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "city" => Ok(Terrain::City),
            "highway" => Ok(Terrain::Highway),
            "mixed" => Ok(Terrain::Mixed),
            other => Err(anyhow!("unknown terrain: {other}")),
        }
    }
}

/// Planned journey. Fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripConfig {
    pub distance_km: f64,
    pub terrain: Terrain,
}

impl TripConfig {
    /// Distances outside the slider range are clamped, non-finite ones reset to the default.
    pub fn new(distance_km: f64, terrain: Terrain) -> Self {
        Self {
            distance_km: clamp_distance(distance_km),
            terrain,
        }
    }

    pub fn with_distance(self, distance_km: f64) -> Self {
        Self::new(distance_km, self.terrain)
    }

    pub fn with_terrain(self, terrain: Terrain) -> Self {
        Self::new(self.distance_km, terrain)
    }
}

impl Default for TripConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DISTANCE_KM, Terrain::Mixed)
    }
}

pub fn clamp_distance(km: f64) -> f64 {
    if !km.is_finite() {
        return DEFAULT_DISTANCE_KM;
    }
    km.clamp(MIN_DISTANCE_KM, MAX_DISTANCE_KM)
}

#[derive(Debug, Clone)]
pub struct Config {
    pub distance_km: f64,
    pub terrain: Terrain,
    pub tick_ms: u64,
    pub start_delay_ms: u64,
    pub distance_basis: DistanceBasis,
    /// JSON-lines frame output; disabled when unset.
    pub frames_path: Option<String>,
    pub autostart: bool,
    pub quiet: bool,
    pub control_capacity: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            distance_km: std::env::var("DISTANCE_KM").ok().and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_DISTANCE_KM),
            terrain: std::env::var("TERRAIN").ok().and_then(|v| v.parse().ok()).unwrap_or_default(),
            tick_ms: std::env::var("TICK_MS").ok().and_then(|v| v.parse().ok()).filter(|v| *v > 0).unwrap_or(50),
            start_delay_ms: std::env::var("START_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(100),
            distance_basis: std::env::var("DISTANCE_BASIS").ok().and_then(|v| v.parse().ok()).unwrap_or_default(),
            frames_path: std::env::var("FRAMES_PATH").ok().filter(|v| !v.is_empty()),
            autostart: env_flag("AUTOSTART"),
            quiet: env_flag("QUIET"),
            control_capacity: std::env::var("CONTROL_CAPACITY").ok().and_then(|v| v.parse().ok()).filter(|v| *v > 0).unwrap_or(32),
        }
    }

    pub fn trip(&self) -> TripConfig {
        TripConfig::new(self.distance_km, self.terrain)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            distance_km: DEFAULT_DISTANCE_KM,
            terrain: Terrain::Mixed,
            tick_ms: 50,
            start_delay_ms: 100,
            distance_basis: DistanceBasis::PreTick,
            frames_path: None,
            autostart: false,
            quiet: false,
            control_capacity: 32,
        }
    }
}

fn env_flag(key: &str) -> bool {
    matches!(
        std::env::var(key).as_deref().map(str::trim),
        Ok("1") | Ok("true") | Ok("yes")
    )
}
