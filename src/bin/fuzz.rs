//! Seeded random control/tick sequences with invariant checks after every step.
//!
//! Prints the generated log as JSON lines so a failing seed can be fed to `replay`.
//! Usage: SEED=7 EVENTS=500 cargo run --bin fuzz

use std::env;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use tripsim::engine::events::{ControlEvent, Event, SysEvent};
use tripsim::engine::reducer::{reduce, ReducerConfig};
use tripsim::state::{Terrain, TripConfig};
use tripsim::verify::invariants::{assert_monotonic, assert_run_invariants};

fn main() {
    let seed = env::var("SEED")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(42u64);
    let events = env::var("EVENTS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(500u64);

    let mut rng = StdRng::seed_from_u64(seed);
    let cfg = ReducerConfig::default();
    let mut state = cfg.initial_state(TripConfig::default());
    let mut ts = 0u64;
    let mut violations = 0u64;
    let mut completed = 0u64;

    for _ in 0..events {
        ts += rng.gen_range(1..=cfg.tick_ms);
        let roll = rng.gen_range(0..100);
        let (event, line) = if roll < 70 {
            (Event::Sys(SysEvent::Tick { ts }), json!({"type": "Tick", "ts": ts}))
        } else if roll < 80 {
            (Event::Control(ControlEvent::Start { ts }), json!({"type": "Start", "ts": ts}))
        } else if roll < 87 {
            (Event::Control(ControlEvent::Pause { ts }), json!({"type": "Pause", "ts": ts}))
        } else if roll < 92 {
            (Event::Control(ControlEvent::Reset { ts }), json!({"type": "Reset", "ts": ts}))
        } else {
            // deliberately out of range now and then to exercise clamping
            let distance_km = rng.gen_range(0.0..1000.0);
            let terrain = Terrain::ALL[rng.gen_range(0..Terrain::ALL.len())];
            (
                Event::Control(ControlEvent::Configure {
                    ts,
                    trip: TripConfig::new(distance_km, terrain),
                }),
                json!({"type": "Configure", "ts": ts, "distance_km": distance_km, "terrain": terrain}),
            )
        };
        println!("{}", line);

        let prev = state.run.clone();
        let was_complete = prev.is_complete();
        reduce(&mut state, event, &cfg);
        if state.run.is_complete() && !was_complete {
            completed += 1;
        }

        if let Err(v) = assert_run_invariants(&state.run) {
            eprintln!("seq={}: {}", state.seq, v);
            violations += 1;
        }
        if state.run.progress_pct >= prev.progress_pct {
            if let Err(v) = assert_monotonic(&prev, &state.run) {
                eprintln!("seq={}: {}", state.seq, v);
                violations += 1;
            }
        }
    }

    eprintln!(
        "seed={} events={} trips_completed={} violations={} fingerprint={}",
        seed,
        events,
        completed,
        violations,
        state.run.fingerprint()
    );
    if violations > 0 {
        std::process::exit(1);
    }
}
