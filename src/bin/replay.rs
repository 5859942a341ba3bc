//! Replays a JSON-lines event log through the reducer and checks invariants.
//!
//! Usage: cargo run --bin fuzz | cargo run --bin replay
//! Each line: {"type":"Start","ts":0} | {"type":"Tick","ts":150} |
//! {"type":"Configure","ts":0,"distance_km":400,"terrain":"city"} | ...

use std::io::{self, BufRead};

use anyhow::Result;

use tripsim::engine::bus::EventBus;
use tripsim::engine::events::{ControlEvent, Event, SysEvent, Timestamp};
use tripsim::engine::reducer::{reduce, replay, ReducerConfig};
use tripsim::engine::state::ComponentSeeds;
use tripsim::engine::stepper::DegradationSimulator;
use tripsim::presenter::Frame;
use tripsim::state::{Config, Terrain, TripConfig};
use tripsim::verify::invariants::{assert_monotonic, assert_run_invariants};

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type")]
enum InputEvent {
    Start {
        ts: Timestamp,
    },
    Pause {
        ts: Timestamp,
    },
    Reset {
        ts: Timestamp,
    },
    Tick {
        ts: Timestamp,
    },
    Configure {
        ts: Timestamp,
        distance_km: f64,
        terrain: Terrain,
    },
}

impl From<InputEvent> for Event {
    fn from(evt: InputEvent) -> Self {
        match evt {
            InputEvent::Start { ts } => Event::Control(ControlEvent::Start { ts }),
            InputEvent::Pause { ts } => Event::Control(ControlEvent::Pause { ts }),
            InputEvent::Reset { ts } => Event::Control(ControlEvent::Reset { ts }),
            InputEvent::Tick { ts } => Event::Sys(SysEvent::Tick { ts }),
            InputEvent::Configure {
                ts,
                distance_km,
                terrain,
            } => Event::Control(ControlEvent::Configure {
                ts,
                trip: TripConfig::new(distance_km, terrain),
            }),
        }
    }
}

fn main() -> Result<()> {
    let config = Config::from_env();
    let cfg = ReducerConfig {
        tick_ms: config.tick_ms,
        start_delay_ms: config.start_delay_ms,
        simulator: DegradationSimulator::new(ComponentSeeds::default(), config.distance_basis),
    };

    let mut events = Vec::new();
    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<InputEvent>(&line) {
            Ok(evt) => events.push(Event::from(evt)),
            Err(err) => eprintln!("bad event json: {}", err),
        }
    }

    let mut bus = EventBus::new();
    for event in events.iter().cloned() {
        bus.push(event);
    }

    let mut state = cfg.initial_state(config.trip());
    let mut violations = 0usize;
    while let Some(event) = bus.pop() {
        let prev = state.run.clone();
        let name = event.name();
        reduce(&mut state, event, &cfg);

        if let Err(v) = assert_run_invariants(&state.run) {
            eprintln!("seq={} after {}: {}", state.seq, name, v);
            violations += 1;
        }
        // a drop in progress means the run was reset or restarted
        if state.run.progress_pct >= prev.progress_pct {
            if let Err(v) = assert_monotonic(&prev, &state.run) {
                eprintln!("seq={} after {}: {}", state.seq, name, v);
                violations += 1;
            }
        }
    }

    let (again, _) = replay(events, config.trip(), &cfg);
    if again.run.fingerprint() != state.run.fingerprint() {
        eprintln!("replay diverged: {} != {}", again.run.fingerprint(), state.run.fingerprint());
        violations += 1;
    }

    println!("{}", serde_json::to_string(&Frame::capture(&state))?);
    eprintln!(
        "events={} progress={}% warnings={:?} fingerprint={} violations={}",
        state.seq,
        state.run.progress_pct,
        state.run.warnings,
        state.run.fingerprint(),
        violations
    );
    if violations > 0 {
        std::process::exit(1);
    }
    Ok(())
}
