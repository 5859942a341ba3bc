use std::collections::HashSet;

use crate::engine::state::SimulationRun;

#[derive(Debug, Clone, PartialEq)]
pub struct InvariantViolation {
    pub msg: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.msg)
    }
}

impl std::error::Error for InvariantViolation {}

fn violation(msg: String) -> Result<(), InvariantViolation> {
    Err(InvariantViolation { msg })
}

pub fn assert_run_invariants(run: &SimulationRun) -> Result<(), InvariantViolation> {
    if run.progress_pct > 100 {
        return violation(format!("progress {} above 100", run.progress_pct));
    }
    if run.progress_pct >= 100 && run.running {
        return violation("finished trip still running".to_string());
    }
    for c in &run.components {
        if c.current_health.is_nan() {
            return violation(format!("{}: NaN health", c.name));
        }
        if c.current_health < 0.0 || c.current_health > c.initial_health {
            return violation(format!(
                "{}: health {} outside [0, {}]",
                c.name, c.current_health, c.initial_health
            ));
        }
    }
    assert_warnings_consistent(run)
}

/// Warnings are unique and each one names a component at or below its threshold.
pub fn assert_warnings_consistent(run: &SimulationRun) -> Result<(), InvariantViolation> {
    let mut seen = HashSet::new();
    for name in &run.warnings {
        if !seen.insert(name.as_str()) {
            return violation(format!("duplicate warning for {}", name));
        }
        match run.component(name) {
            Some(c) if c.is_critical() => {}
            Some(c) => {
                return violation(format!(
                    "{} warned at {} above threshold {}",
                    name, c.current_health, c.warn_threshold
                ))
            }
            None => return violation(format!("warning for unknown component {}", name)),
        }
    }
    for c in &run.components {
        if c.is_critical() && !seen.contains(c.name.as_str()) && run.progress_pct > 0 {
            return violation(format!("{} below threshold without a warning", c.name));
        }
    }
    Ok(())
}

/// `next` must be a later snapshot of the same run as `prev`.
pub fn assert_monotonic(prev: &SimulationRun, next: &SimulationRun) -> Result<(), InvariantViolation> {
    if next.progress_pct < prev.progress_pct {
        return violation(format!(
            "progress went backwards {} -> {}",
            prev.progress_pct, next.progress_pct
        ));
    }
    for (a, b) in prev.components.iter().zip(&next.components) {
        if b.current_health > a.current_health {
            return violation(format!(
                "{} recovered {} -> {}",
                a.name, a.current_health, b.current_health
            ));
        }
    }
    if !next.warnings.starts_with(&prev.warnings) {
        return violation("warnings rewritten mid-run".to_string());
    }
    Ok(())
}
