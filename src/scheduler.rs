//! Tick scheduler: the single task that owns a trip.
//!
//! Controls arrive over a bounded channel, ticks come from an interval that
//! only exists between `ArmTimer` and `DisarmTimer`. Both are pushed onto the
//! event bus and drained through the reducer, so the task is the only writer
//! of the run state and two ticks can never overlap.

use anyhow::{anyhow, Result};
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};

use crate::engine::bus::EventBus;
use crate::engine::events::*;
use crate::engine::reducer::{reduce, ReducerConfig};
use crate::engine::state::{ComponentSeeds, EngineState};
use crate::engine::stepper::DegradationSimulator;
use crate::logging::{self, obj, v_str, Domain, Level, ProfileScope};
use crate::presenter::{Frame, Presenter};
use crate::state::{Config, TripConfig};

/// Controller side of a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<ControlEvent>,
    frames: watch::Receiver<Frame>,
}

impl SchedulerHandle {
    async fn send(&self, event: ControlEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| anyhow!("scheduler stopped"))
    }

    pub async fn start(&self) -> Result<()> {
        self.send(ControlEvent::Start { ts: 0 }).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(ControlEvent::Pause { ts: 0 }).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.send(ControlEvent::Reset { ts: 0 }).await
    }

    pub async fn configure(&self, trip: TripConfig) -> Result<()> {
        self.send(ControlEvent::Configure { ts: 0, trip }).await
    }

    pub fn frames(&self) -> watch::Receiver<Frame> {
        self.frames.clone()
    }

    pub fn latest(&self) -> Frame {
        self.frames.borrow().clone()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    pub ticks: u64,
    pub trips_completed: u64,
    pub alerts: u64,
}

pub struct TripScheduler {
    state: EngineState,
    cfg: ReducerConfig,
    bus: EventBus,
    rx: mpsc::Receiver<ControlEvent>,
    frames: watch::Sender<Frame>,
    ticker: Option<Interval>,
    presenters: Vec<Box<dyn Presenter>>,
    origin: Instant,
    stats: SessionStats,
}

impl TripScheduler {
    pub fn new(cfg: ReducerConfig, trip: TripConfig, capacity: usize) -> (Self, SchedulerHandle) {
        let state = cfg.initial_state(trip);
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (frames, frames_rx) = watch::channel(Frame::capture(&state));

        let scheduler = Self {
            state,
            cfg,
            bus: EventBus::new(),
            rx,
            frames,
            ticker: None,
            presenters: Vec::new(),
            origin: Instant::now(),
            stats: SessionStats::default(),
        };
        (scheduler, SchedulerHandle { tx, frames: frames_rx })
    }

    pub fn from_config(config: &Config) -> (Self, SchedulerHandle) {
        let cfg = ReducerConfig {
            tick_ms: config.tick_ms,
            start_delay_ms: config.start_delay_ms,
            simulator: DegradationSimulator::new(ComponentSeeds::default(), config.distance_basis),
        };
        Self::new(cfg, config.trip(), config.control_capacity)
    }

    pub fn with_presenter(mut self, presenter: Box<dyn Presenter>) -> Self {
        self.presenters.push(presenter);
        self
    }

    /// Runs until every handle is dropped; returns the final engine state.
    pub async fn run(mut self) -> EngineState {
        logging::log(
            Level::Info,
            Domain::System,
            "scheduler_start",
            obj(&[
                ("tick_ms", json!(self.cfg.tick_ms)),
                ("distance_km", json!(self.state.trip.distance_km)),
                ("terrain", v_str(self.state.trip.terrain.as_str())),
                ("distance_basis", json!(self.cfg.simulator.basis())),
            ]),
        );

        loop {
            tokio::select! {
                biased;
                msg = self.rx.recv() => match msg {
                    Some(control) => {
                        let ts = self.now_ms();
                        self.bus.push(Event::Control(control.at(ts)));
                    }
                    None => break,
                },
                _ = next_tick(&mut self.ticker) => {
                    let ts = self.now_ms();
                    self.bus.push(Event::Sys(SysEvent::Tick { ts }));
                }
            }
            self.process().await;
        }

        // channel closed: release the timer whatever state the trip is in
        self.ticker = None;
        for p in self.presenters.iter_mut() {
            if let Err(err) = p.finish().await {
                log_presenter_error(&err);
            }
        }
        logging::log_session_summary(
            self.origin.elapsed().as_secs_f64(),
            self.stats.trips_completed,
            self.stats.ticks,
            self.stats.alerts,
        );
        self.state
    }

    fn now_ms(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }

    /// Drain the bus through the reducer, execute commands, publish a frame per event.
    async fn process(&mut self) {
        while let Some(event) = self.bus.pop() {
            let is_tick = matches!(event, Event::Sys(_));
            let progress_before = self.state.run.progress_pct;
            let restarted = matches!(event, Event::Control(ControlEvent::Start { .. }))
                && !self.state.run.running
                && self.state.run.progress_pct > 0;
            let name = event.name();
            let output = {
                let _scope = ProfileScope::with_context("reduce", &[("event", v_str(name))]);
                reduce(&mut self.state, event, &self.cfg)
            };
            logging::log_audit(name, self.state.seq, &output.state_hash);

            for cmd in output.commands {
                self.execute(cmd, name, restarted);
            }

            if is_tick && self.state.run.progress_pct != progress_before {
                self.stats.ticks += 1;
                let risk = crate::risk::classify(&self.state.run.components);
                logging::log_tick(
                    self.state.run.progress_pct,
                    self.state.run.distance_covered_km(&self.state.trip),
                    risk.as_str(),
                    &output.state_hash,
                );
            }

            let frame = Frame::capture(&self.state);
            self.frames.send_replace(frame.clone());
            for p in self.presenters.iter_mut() {
                if let Err(err) = p.render(&frame).await {
                    log_presenter_error(&err);
                }
            }
        }
    }

    fn execute(&mut self, cmd: Command, event: &str, restarted: bool) {
        match cmd {
            Command::ArmTimer { period_ms, delay_ms } => {
                let period = Duration::from_millis(period_ms.max(1));
                let first = Instant::now() + Duration::from_millis(delay_ms) + period;
                let mut ticker = interval_at(first, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.ticker = Some(ticker);
                logging::log_trip_start(
                    self.state.trip.distance_km,
                    self.state.trip.terrain.as_str(),
                    restarted,
                );
            }

            Command::DisarmTimer { reason } => {
                self.ticker = None;
                let reason = match reason {
                    DisarmReason::Paused => "paused",
                    DisarmReason::Reset => "reset",
                    DisarmReason::Complete => "complete",
                };
                logging::log_trip_stop(reason, self.state.run.progress_pct);
            }

            Command::ServiceAlert { component, health, threshold } => {
                self.stats.alerts += 1;
                logging::log_service_alert(&component, health, threshold);
            }

            Command::RiskChanged { from, to } => {
                logging::log_risk_change(from.as_str(), to.as_str(), to.note());
            }

            Command::TripComplete { distance_km, warnings } => {
                self.stats.trips_completed += 1;
                logging::log_trip_complete(distance_km, &warnings, &self.state.hash());
            }

            Command::Log { level, msg } => {
                logging::log_control(event, matches!(level, LogLevel::Info), &msg);
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn log_presenter_error(err: &anyhow::Error) {
    logging::log(
        Level::Error,
        Domain::System,
        "presenter_error",
        obj(&[("msg", v_str(&err.to_string()))]),
    );
}
