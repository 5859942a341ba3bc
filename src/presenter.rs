//! Frames handed to whatever renders the trip.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::engine::state::EngineState;
use crate::risk::{HealthBand, RiskLevel};
use crate::state::Terrain;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentView {
    pub name: String,
    /// Rounded for display
    pub health: u8,
    pub health_raw: f64,
    pub initial: f64,
    pub threshold: f64,
    pub band: HealthBand,
}

/// Snapshot recomputed after every processed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub seq: u64,
    pub progress_pct: u8,
    pub distance_km: f64,
    pub distance_covered_km: u32,
    pub terrain: Terrain,
    pub running: bool,
    pub risk: RiskLevel,
    pub risk_note: String,
    pub components: Vec<ComponentView>,
    pub alerts: Vec<String>,
    pub state_hash: String,
}

impl Frame {
    pub fn capture(state: &EngineState) -> Self {
        let run = &state.run;
        let risk = crate::risk::classify(&run.components);
        Self {
            seq: state.seq,
            progress_pct: run.progress_pct,
            distance_km: state.trip.distance_km,
            distance_covered_km: run.distance_covered_km(&state.trip).round() as u32,
            terrain: state.trip.terrain,
            running: run.running,
            risk,
            risk_note: risk.note().to_string(),
            components: run
                .components
                .iter()
                .map(|c| ComponentView {
                    name: c.name.clone(),
                    health: c.display_health(),
                    health_raw: c.current_health,
                    initial: c.initial_health,
                    threshold: c.warn_threshold,
                    band: HealthBand::of(c),
                })
                .collect(),
            alerts: run.warnings.iter().map(|w| format!("{} exceeded threshold", w)).collect(),
            state_hash: state.hash(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.progress_pct >= 100 && !self.running
    }

    /// One-line summary in the style of the engine status output.
    pub fn status_line(&self) -> String {
        let parts: Vec<String> = self
            .components
            .iter()
            .map(|c| format!("{}={}%", c.name, c.health))
            .collect();
        format!(
            "[TRIP] {:>3}% {}/{:.0}km {} ({}) risk={} running={} | {}",
            self.progress_pct,
            self.distance_covered_km,
            self.distance_km,
            self.terrain.label(),
            self.terrain.description(),
            self.risk,
            self.running,
            parts.join(" ")
        )
    }
}

#[async_trait]
pub trait Presenter: Send {
    async fn render(&mut self, frame: &Frame) -> Result<()>;

    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Status lines on stderr; skips frames that did not change the visible state.
pub struct StatusPresenter {
    last: Option<(u8, bool, usize)>,
}

impl StatusPresenter {
    pub fn new() -> Self {
        Self { last: None }
    }
}

impl Default for StatusPresenter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Presenter for StatusPresenter {
    async fn render(&mut self, frame: &Frame) -> Result<()> {
        let key = (frame.progress_pct, frame.running, frame.alerts.len());
        if self.last == Some(key) {
            return Ok(());
        }
        if let Some((_, _, seen)) = self.last {
            for alert in frame.alerts.iter().skip(seen) {
                eprintln!("[ALERT] {}", alert);
            }
        }
        self.last = Some(key);
        eprintln!("{}", frame.status_line());
        if frame.is_finished() {
            eprintln!("[RISK] {}: {}", frame.risk, frame.risk_note);
        }
        Ok(())
    }
}

/// One JSON frame per line.
pub struct JsonlPresenter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonlPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl JsonlPresenter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

#[async_trait]
impl<W: Write + Send> Presenter for JsonlPresenter<W> {
    async fn render(&mut self, frame: &Frame) -> Result<()> {
        serde_json::to_writer(&mut self.out, frame)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::reducer::ReducerConfig;
    use crate::state::TripConfig;

    fn state_at(progress: u8, trip: TripConfig) -> EngineState {
        let cfg = ReducerConfig::default();
        let mut state = cfg.initial_state(trip);
        state.run = cfg.simulator.start(state.run);
        while state.run.progress_pct < progress && state.run.running {
            state.run = cfg.simulator.tick(std::mem::take(&mut state.run), &state.trip);
        }
        state
    }

    #[test]
    fn test_frame_rounds_for_display() {
        let state = state_at(100, TripConfig::new(200.0, Terrain::City));
        let frame = Frame::capture(&state);

        let brakes = &frame.components[0];
        assert_eq!(brakes.name, "Front Brakes");
        assert_eq!(brakes.health, 39);
        assert_eq!(brakes.band, HealthBand::Watch);
        assert_eq!(frame.distance_covered_km, 200);
        assert!(frame.is_finished());
        assert_eq!(frame.risk, RiskLevel::Medium);
        assert!(frame.alerts.is_empty());
    }

    #[test]
    fn test_frame_alert_text() {
        let state = state_at(40, TripConfig::new(800.0, Terrain::City));
        let frame = Frame::capture(&state);
        assert_eq!(frame.alerts, vec!["Front Brakes exceeded threshold"]);
        assert_eq!(frame.risk, RiskLevel::High);
        assert_eq!(frame.risk_note, RiskLevel::High.note());
        assert_eq!(frame.distance_covered_km, 320);
    }

    #[test]
    fn test_status_line_mentions_parts() {
        let frame = Frame::capture(&state_at(0, TripConfig::default()));
        let line = frame.status_line();
        assert!(line.contains("Front Brakes=58%"));
        assert!(line.contains("0/200km Mixed (Combined)"));
    }

    #[test]
    fn test_status_line_terrain_labels() {
        let city = Frame::capture(&state_at(0, TripConfig::new(350.0, Terrain::City)));
        assert!(city.status_line().contains("350km City (Urban)"));

        let highway = Frame::capture(&state_at(0, TripConfig::new(350.0, Terrain::Highway)));
        assert!(highway.status_line().contains("Highway (Interstate)"));
    }

    #[tokio::test]
    async fn test_jsonl_presenter_writes_lines() {
        let mut p = JsonlPresenter::new(Vec::new());
        let frame = Frame::capture(&state_at(10, TripConfig::default()));
        p.render(&frame).await.unwrap();
        p.render(&frame).await.unwrap();
        p.finish().await.unwrap();

        let out = String::from_utf8(p.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: Frame = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(back.progress_pct, 10);
        assert_eq!(back.terrain, Terrain::Mixed);
    }
}
