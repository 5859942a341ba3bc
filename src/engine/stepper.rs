//! Degradation stepper: the pure trip lifecycle.
//!
//! Every operation takes the run by value and hands back the next one, so the
//! scheduler, the replay tool and the tests all drive the same code.

use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use super::state::{ComponentSeeds, ComponentState, SimulationRun};
use crate::risk::{self, RiskLevel};
use crate::state::TripConfig;

/// Which progress value feeds the distance used for degradation on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceBasis {
    /// Progress before the tick is applied. The last tick only accounts for
    /// 99% of the configured distance.
    #[default]
    PreTick,
    /// Progress after the tick; the last tick reaches the full distance.
    PostTick,
}

impl FromStr for DistanceBasis {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pre" | "pre_tick" => Ok(DistanceBasis::PreTick),
            "post" | "post_tick" => Ok(DistanceBasis::PostTick),
            other => Err(anyhow!("unknown distance basis: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DegradationSimulator {
    seeds: ComponentSeeds,
    basis: DistanceBasis,
}

impl DegradationSimulator {
    pub fn new(seeds: ComponentSeeds, basis: DistanceBasis) -> Self {
        Self { seeds, basis }
    }

    pub fn seeds(&self) -> &ComponentSeeds {
        &self.seeds
    }

    pub fn basis(&self) -> DistanceBasis {
        self.basis
    }

    /// Fresh run at the literal seed values, stopped.
    pub fn reset(&self) -> SimulationRun {
        SimulationRun::from_seeds(&self.seeds)
    }

    /// Starting a trip that already moved restarts it from the seeds.
    pub fn start(&self, run: SimulationRun) -> SimulationRun {
        let mut run = if run.progress_pct > 0 { self.reset() } else { run };
        run.running = true;
        run
    }

    pub fn pause(&self, mut run: SimulationRun) -> SimulationRun {
        run.running = false;
        run
    }

    pub fn tick(&self, mut run: SimulationRun, trip: &TripConfig) -> SimulationRun {
        if !run.running {
            return run;
        }

        let prev = run.progress_pct.min(100);
        let next = (prev + 1).min(100);
        let basis_pct = match self.basis {
            DistanceBasis::PreTick => prev,
            DistanceBasis::PostTick => next,
        };
        let distance_km = (basis_pct as f64 / 100.0) * trip.distance_km.max(0.0);
        let multiplier = trip.terrain.multiplier();

        for c in run.components.iter_mut() {
            // never recovers within a run
            c.current_health = degraded_health(c, distance_km, multiplier).min(c.current_health);
        }

        for c in &run.components {
            if c.is_critical() && !run.warnings.contains(&c.name) {
                run.warnings.push(c.name.clone());
            }
        }

        run.progress_pct = next;
        if next >= 100 {
            run.running = false;
        }
        run
    }

    pub fn risk_level(&self, run: &SimulationRun) -> RiskLevel {
        risk::classify(&run.components)
    }
}

impl Default for DegradationSimulator {
    fn default() -> Self {
        Self::new(ComponentSeeds::default(), DistanceBasis::default())
    }
}

/// Health after `distance_km` on terrain with `multiplier`, clamped to `[0, initial]`.
pub fn degraded_health(c: &ComponentState, distance_km: f64, multiplier: f64) -> f64 {
    let initial = non_negative(c.initial_health);
    let degradation = (non_negative(distance_km) / 100.0) * non_negative(c.degradation_rate) * non_negative(multiplier);
    let health = initial - degradation * 100.0;
    if health.is_finite() {
        health.clamp(0.0, initial)
    } else {
        0.0
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}
