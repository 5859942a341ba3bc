//! Canonical typed events for deterministic replay.

use serde::{Deserialize, Serialize};

use crate::risk::RiskLevel;
use crate::state::TripConfig;

/// Logical time in milliseconds since the session began.
pub type Timestamp = u64;

/// All inputs that can affect the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Control(ControlEvent),
    Sys(SysEvent),
}

impl Event {
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Event::Control(e) => e.timestamp(),
            Event::Sys(e) => e.timestamp(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::Control(e) => e.name(),
            Event::Sys(SysEvent::Tick { .. }) => "tick",
        }
    }
}

/// Operator commands from the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlEvent {
    Start { ts: Timestamp },
    Pause { ts: Timestamp },
    Reset { ts: Timestamp },
    /// Only honoured while the trip is stopped.
    Configure { ts: Timestamp, trip: TripConfig },
}

impl ControlEvent {
    pub fn timestamp(&self) -> Timestamp {
        match self {
            ControlEvent::Start { ts } => *ts,
            ControlEvent::Pause { ts } => *ts,
            ControlEvent::Reset { ts } => *ts,
            ControlEvent::Configure { ts, .. } => *ts,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControlEvent::Start { .. } => "start",
            ControlEvent::Pause { .. } => "pause",
            ControlEvent::Reset { .. } => "reset",
            ControlEvent::Configure { .. } => "configure",
        }
    }

    /// Same command stamped with a different time.
    pub fn at(self, ts: Timestamp) -> Self {
        match self {
            ControlEvent::Start { .. } => ControlEvent::Start { ts },
            ControlEvent::Pause { .. } => ControlEvent::Pause { ts },
            ControlEvent::Reset { .. } => ControlEvent::Reset { ts },
            ControlEvent::Configure { trip, .. } => ControlEvent::Configure { ts, trip },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SysEvent {
    Tick { ts: Timestamp },
}

impl SysEvent {
    pub fn timestamp(&self) -> Timestamp {
        match self {
            SysEvent::Tick { ts } => *ts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisarmReason {
    Paused,
    Reset,
    Complete,
}

/// Commands emitted by the reducer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Begin periodic ticks after `delay_ms`.
    ArmTimer {
        period_ms: u64,
        delay_ms: u64,
    },
    DisarmTimer {
        reason: DisarmReason,
    },
    ServiceAlert {
        component: String,
        health: f64,
        threshold: f64,
    },
    RiskChanged {
        from: RiskLevel,
        to: RiskLevel,
    },
    TripComplete {
        distance_km: f64,
        warnings: Vec<String>,
    },
    Log {
        level: LogLevel,
        msg: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}
