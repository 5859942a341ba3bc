use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::state::ComponentState;

/// Health points above threshold that still count as "approaching".
pub const WATCH_MARGIN: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// Banner text shown under the risk level.
    pub fn note(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Safe to proceed. All components within acceptable limits.",
            RiskLevel::Medium => "Monitor recommended. Some components approaching threshold.",
            RiskLevel::High => "Trip risk detected. Service recommended before journey.",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-component colour band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthBand {
    Healthy,
    Watch,
    Critical,
}

impl HealthBand {
    pub fn of(c: &ComponentState) -> Self {
        if c.current_health <= c.warn_threshold {
            HealthBand::Critical
        } else if c.current_health <= c.warn_threshold + WATCH_MARGIN {
            HealthBand::Watch
        } else {
            HealthBand::Healthy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthBand::Healthy => "healthy",
            HealthBand::Watch => "watch",
            HealthBand::Critical => "critical",
        }
    }
}

/// Aggregate level: any critical part is high, any part in the watch band is medium.
pub fn classify(components: &[ComponentState]) -> RiskLevel {
    let mut level = RiskLevel::Low;
    for c in components {
        match HealthBand::of(c) {
            HealthBand::Critical => return RiskLevel::High,
            HealthBand::Watch => level = RiskLevel::Medium,
            HealthBand::Healthy => {}
        }
    }
    level
}

/// Remembers the last reported level so only transitions surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskEngine {
    last: RiskLevel,
}

impl RiskEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> RiskLevel {
        self.last
    }

    /// Returns `Some((from, to))` when the level moved since the previous call.
    pub fn observe(&mut self, components: &[ComponentState]) -> Option<(RiskLevel, RiskLevel)> {
        let now = classify(components);
        if now == self.last {
            return None;
        }
        let from = self.last;
        self.last = now;
        Some((from, now))
    }

    pub fn reset(&mut self) {
        self.last = RiskLevel::Low;
    }
}
