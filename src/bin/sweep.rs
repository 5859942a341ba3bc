//! Distance x terrain sweep over the pure stepper.
//!
//! Usage: cargo run --release --bin sweep
//! Optional: DISTANCE_BASIS=post

use serde_json::json;

use tripsim::engine::state::ComponentSeeds;
use tripsim::engine::stepper::{DegradationSimulator, DistanceBasis};
use tripsim::logging::ProfileScope;
use tripsim::state::{Terrain, TripConfig, MAX_DISTANCE_KM, MIN_DISTANCE_KM};

const STEP_KM: f64 = 50.0;

fn main() {
    let basis: DistanceBasis = std::env::var("DISTANCE_BASIS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    let sim = DegradationSimulator::new(ComponentSeeds::default(), basis);
    let _scope = ProfileScope::new("sweep");

    for terrain in Terrain::ALL {
        let mut km = MIN_DISTANCE_KM;
        while km <= MAX_DISTANCE_KM {
            let trip = TripConfig::new(km, terrain);
            let mut run = sim.start(sim.reset());
            let mut ticks = 0u32;
            while run.running {
                run = sim.tick(run, &trip);
                ticks += 1;
            }

            let health: serde_json::Map<String, serde_json::Value> = run
                .components
                .iter()
                .map(|c| (c.name.clone(), json!((c.current_health * 1000.0).round() / 1000.0)))
                .collect();
            println!(
                "{}",
                json!({
                    "distance_km": trip.distance_km,
                    "terrain": terrain.as_str(),
                    "ticks": ticks,
                    "risk": sim.risk_level(&run).as_str(),
                    "warnings": run.warnings,
                    "health": health,
                    "fingerprint": run.fingerprint(),
                })
            );
            km += STEP_KM;
        }
    }
}
