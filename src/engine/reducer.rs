//! Pure reducer: (State, Event) -> (State, Vec<Command>)
//!
//! All trip state transitions happen here. The reducer never touches a clock
//! or a timer; it asks for one through `ArmTimer` / `DisarmTimer` and the
//! scheduler carries the request out. Every path that stops a running trip
//! (pause, reset, completion) emits exactly one `DisarmTimer`.

use super::bus::EventBus;
use super::events::*;
use super::state::EngineState;
use super::stepper::DegradationSimulator;
use crate::state::TripConfig;

#[derive(Debug, Clone)]
pub struct ReducerConfig {
    /// Interval between ticks
    pub tick_ms: u64,
    /// Delay before the first tick after a start
    pub start_delay_ms: u64,
    pub simulator: DegradationSimulator,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            start_delay_ms: 100,
            simulator: DegradationSimulator::default(),
        }
    }
}

impl ReducerConfig {
    /// Stopped engine at the seed values for `trip`.
    pub fn initial_state(&self, trip: TripConfig) -> EngineState {
        let mut state = EngineState::new(trip, self.simulator.reset());
        state.risk.observe(&state.run.components);
        state
    }
}

/// Result of processing an event
#[derive(Debug)]
pub struct ReducerOutput {
    pub commands: Vec<Command>,
    pub state_hash: String,
}

/// Pure reducer function
pub fn reduce(state: &mut EngineState, event: Event, cfg: &ReducerConfig) -> ReducerOutput {
    let mut commands = Vec::new();

    state.now = state.now.max(event.timestamp());
    state.seq += 1;

    match event {
        Event::Control(control) => handle_control(state, control, cfg, &mut commands),
        Event::Sys(SysEvent::Tick { .. }) => handle_tick(state, cfg, &mut commands),
    }

    ReducerOutput {
        commands,
        state_hash: state.hash(),
    }
}

fn handle_control(
    state: &mut EngineState,
    event: ControlEvent,
    cfg: &ReducerConfig,
    commands: &mut Vec<Command>,
) {
    let sim = &cfg.simulator;
    match event {
        ControlEvent::Start { .. } => {
            if state.run.running {
                commands.push(Command::Log {
                    level: LogLevel::Debug,
                    msg: "start ignored: trip already running".to_string(),
                });
                return;
            }
            let restarted = state.run.progress_pct > 0;
            state.run = sim.start(std::mem::take(&mut state.run));
            if restarted {
                commands.push(Command::Log {
                    level: LogLevel::Info,
                    msg: "restarting trip from seed values".to_string(),
                });
                report_risk(state, commands);
            }
            state.timer_armed = true;
            commands.push(Command::ArmTimer {
                period_ms: cfg.tick_ms,
                delay_ms: cfg.start_delay_ms,
            });
        }

        ControlEvent::Pause { .. } => {
            if !state.run.running {
                commands.push(Command::Log {
                    level: LogLevel::Debug,
                    msg: "pause ignored: trip not running".to_string(),
                });
                return;
            }
            state.run = sim.pause(std::mem::take(&mut state.run));
            disarm(state, DisarmReason::Paused, commands);
        }

        ControlEvent::Reset { .. } => {
            state.run = sim.reset();
            if state.timer_armed {
                disarm(state, DisarmReason::Reset, commands);
            }
            report_risk(state, commands);
        }

        ControlEvent::Configure { trip, .. } => {
            if state.run.running {
                commands.push(Command::Log {
                    level: LogLevel::Warn,
                    msg: "configure rejected: trip settings are locked while running".to_string(),
                });
                return;
            }
            state.trip = TripConfig::new(trip.distance_km, trip.terrain);
            commands.push(Command::Log {
                level: LogLevel::Info,
                msg: format!(
                    "trip configured: {:.0} km {}",
                    state.trip.distance_km, state.trip.terrain
                ),
            });
        }
    }
}

fn handle_tick(state: &mut EngineState, cfg: &ReducerConfig, commands: &mut Vec<Command>) {
    // late ticks after a disarm are expected and dropped
    if !state.run.running {
        return;
    }

    let known = state.run.warnings.len();
    state.run = cfg.simulator.tick(std::mem::take(&mut state.run), &state.trip);

    for name in &state.run.warnings[known..] {
        if let Some(c) = state.run.component(name) {
            commands.push(Command::ServiceAlert {
                component: c.name.clone(),
                health: c.current_health,
                threshold: c.warn_threshold,
            });
        }
    }

    report_risk(state, commands);

    if !state.run.running {
        disarm(state, DisarmReason::Complete, commands);
        commands.push(Command::TripComplete {
            distance_km: state.run.distance_covered_km(&state.trip),
            warnings: state.run.warnings.clone(),
        });
    }
}

fn disarm(state: &mut EngineState, reason: DisarmReason, commands: &mut Vec<Command>) {
    state.timer_armed = false;
    commands.push(Command::DisarmTimer { reason });
}

fn report_risk(state: &mut EngineState, commands: &mut Vec<Command>) {
    if let Some((from, to)) = state.risk.observe(&state.run.components) {
        commands.push(Command::RiskChanged { from, to });
    }
}

/// Fold an event log through the reducer in bus order.
pub fn replay(
    events: impl IntoIterator<Item = Event>,
    trip: TripConfig,
    cfg: &ReducerConfig,
) -> (EngineState, Vec<Command>) {
    let mut bus = EventBus::new();
    for event in events {
        bus.push(event);
    }

    let mut state = cfg.initial_state(trip);
    let mut commands = Vec::new();
    while let Some(event) = bus.pop() {
        commands.extend(reduce(&mut state, event, cfg).commands);
    }
    (state, commands)
}
