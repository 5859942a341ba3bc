//! Line-oriented operator commands for the interactive binary.

use anyhow::{anyhow, bail, Result};

use crate::scheduler::SchedulerHandle;
use crate::state::{Terrain, TripConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerCommand {
    Start,
    Pause,
    Reset,
    Distance(f64),
    Terrain(Terrain),
    Status,
    Quit,
}

impl ControllerCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().ok_or_else(|| anyhow!("empty command"))?;
        let arg = parts.next();
        if parts.next().is_some() {
            bail!("too many arguments: {}", line.trim());
        }

        let cmd = match (verb.to_ascii_lowercase().as_str(), arg) {
            ("start", None) => ControllerCommand::Start,
            ("pause", None) => ControllerCommand::Pause,
            ("reset", None) => ControllerCommand::Reset,
            ("status", None) => ControllerCommand::Status,
            ("quit" | "exit", None) => ControllerCommand::Quit,
            ("distance", Some(km)) => {
                let km: f64 = km.trim_end_matches("km").parse()?;
                ControllerCommand::Distance(km)
            }
            ("terrain", Some(name)) => ControllerCommand::Terrain(name.parse()?),
            (verb, _) => bail!("unknown command: {}", verb),
        };
        Ok(cmd)
    }

    /// Sends the command; returns `false` once the operator asked to quit.
    pub async fn apply(self, handle: &SchedulerHandle) -> Result<bool> {
        match self {
            ControllerCommand::Start => handle.start().await?,
            ControllerCommand::Pause => handle.pause().await?,
            ControllerCommand::Reset => handle.reset().await?,
            ControllerCommand::Distance(km) => {
                let current = handle.latest();
                handle.configure(TripConfig::new(km, current.terrain)).await?
            }
            ControllerCommand::Terrain(terrain) => {
                let current = handle.latest();
                handle.configure(TripConfig::new(current.distance_km, terrain)).await?
            }
            ControllerCommand::Status => {
                let frame = handle.latest();
                eprintln!("{}", frame.status_line());
                for alert in &frame.alerts {
                    eprintln!("  [ALERT] {}", alert);
                }
                eprintln!("  [RISK] {}: {}", frame.risk, frame.risk_note);
            }
            ControllerCommand::Quit => return Ok(false),
        }
        Ok(true)
    }
}
