//! Structured logging for the trip simulator.
//!
//! Design goals:
//! 1. Multi-level granularity (TRACE → FATAL)
//! 2. Domain-specific categories for filtering
//! 3. One run directory per process with JSON-lines streams
//! 4. Replay/audit support via sequence numbers and state fingerprints

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Trip,      // Lifecycle: start, tick, completion
    Component, // Per-part health and service alerts
    Risk,      // Aggregate level transitions
    Control,   // Operator commands and rejections
    System,    // Startup, shutdown
    Profile,   // Performance profiling
    Audit,     // Replay/audit trail entries
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Trip => "trip",
            Domain::Component => "component",
            Domain::Risk => "risk",
            Domain::Control => "control",
            Domain::System => "system",
            Domain::Profile => "profile",
            Domain::Audit => "audit",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // Check LOG_DOMAINS env var (comma-separated list or "all")
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Sequence counter for ordering
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    echo_stdout: bool,
    events: Option<Mutex<BufWriter<File>>>,
    trace: Option<Mutex<BufWriter<File>>>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let base = std::env::var("LOG_DIR").unwrap_or_else(|_| "out/runs".to_string());
        let mut run_dir = PathBuf::from(base);
        run_dir.push(&run_id);
        if let Err(err) = create_dir_all(&run_dir) {
            eprintln!("[log] failed to create run dir: {}", err);
        }

        let _ = std::fs::write(
            run_dir.join("manifest.json"),
            json!({
                "run_id": run_id,
                "ts": ts_now(),
                "pid": process::id(),
                "log_dir": run_dir.to_string_lossy(),
            })
            .to_string(),
        );

        let open = |name: &str| match File::create(run_dir.join(name)) {
            Ok(f) => Some(Mutex::new(BufWriter::new(f))),
            Err(err) => {
                eprintln!("[log] failed to create {}: {}", name, err);
                None
            }
        };

        RunContext {
            events: open("events.jsonl"),
            trace: open("trace.jsonl"),
            echo_stdout: echo_enabled(std::env::var("LOG_STDOUT").ok().as_deref()),
            run_id,
        }
    })
}

/// `LOG_STDOUT` wins when set; unit test builds stay quiet otherwise.
fn echo_enabled(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        Some("0") | Some("false") => false,
        Some(_) => true,
        None => !cfg!(test),
    }
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["component", "terrain", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

fn write_line(writer: &Option<Mutex<BufWriter<File>>>, line: &str) {
    if let Some(Ok(mut w)) = writer.as_ref().map(|m| m.lock()) {
        let _ = writeln!(w, "{}", line);
        let _ = w.flush();
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch milliseconds (for replay correlation)
pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let min_level = Level::from_env();
    if level < min_level || !domain.is_enabled() {
        return;
    }

    emit_record(level, domain.as_str(), event, fields);
}

fn emit_record(level: Level, source: &str, event: &str, fields: Map<String, Value>) {
    let ctx = ensure_run_context();
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("domain".to_string(), json!(source));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));

    let line = Value::Object(entry).to_string();
    match level {
        Level::Trace | Level::Debug => write_line(&ctx.trace, &line),
        _ => write_line(&ctx.events, &line),
    }
    if ctx.echo_stdout {
        println!("{}", line);
    }
}

// =============================================================================
// Trip lifecycle
// =============================================================================

pub fn log_trip_start(distance_km: f64, terrain: &str, restarted: bool) {
    log(
        Level::Info,
        Domain::Trip,
        "trip_start",
        obj(&[
            ("distance_km", v_num(distance_km)),
            ("terrain", v_str(terrain)),
            ("restarted", json!(restarted)),
        ]),
    );
}

/// Per-tick snapshot, trace level so it stays out of the main event stream.
pub fn log_tick(progress_pct: u8, distance_covered_km: f64, risk: &str, state_hash: &str) {
    log(
        Level::Trace,
        Domain::Trip,
        "tick",
        obj(&[
            ("progress_pct", json!(progress_pct)),
            ("distance_covered_km", v_num(distance_covered_km)),
            ("risk", v_str(risk)),
            ("state_hash", v_str(state_hash)),
        ]),
    );
}

pub fn log_trip_stop(reason: &str, progress_pct: u8) {
    log(
        Level::Info,
        Domain::Trip,
        "trip_stop",
        obj(&[("reason", v_str(reason)), ("progress_pct", json!(progress_pct))]),
    );
}

pub fn log_trip_complete(distance_km: f64, warnings: &[String], state_hash: &str) {
    log(
        Level::Info,
        Domain::Trip,
        "trip_complete",
        obj(&[
            ("distance_km", v_num(distance_km)),
            ("warnings", Value::Array(warnings.iter().map(|w| v_str(w)).collect())),
            ("state_hash", v_str(state_hash)),
        ]),
    );
}

// =============================================================================
// Components and risk
// =============================================================================

pub fn log_service_alert(component: &str, health: f64, threshold: f64) {
    log(
        Level::Warn,
        Domain::Component,
        "service_alert",
        obj(&[
            ("component", v_str(component)),
            ("health", v_num(health)),
            ("threshold", v_num(threshold)),
            ("msg", v_str(&format!("{} exceeded threshold", component))),
        ]),
    );
}

pub fn log_risk_change(from: &str, to: &str, note: &str) {
    log(
        Level::Info,
        Domain::Risk,
        "risk_change",
        obj(&[
            ("from", v_str(from)),
            ("to", v_str(to)),
            ("msg", v_str(note)),
        ]),
    );
}

// =============================================================================
// Control and system
// =============================================================================

pub fn log_control(command: &str, accepted: bool, msg: &str) {
    log(
        if accepted { Level::Info } else { Level::Warn },
        Domain::Control,
        "control",
        obj(&[
            ("command", v_str(command)),
            ("accepted", json!(accepted)),
            ("msg", v_str(msg)),
        ]),
    );
}

/// Log an audit entry for replay verification
pub fn log_audit(event_type: &str, seq: u64, state_hash: &str) {
    log(
        Level::Debug,
        Domain::Audit,
        event_type,
        obj(&[("engine_seq", json!(seq)), ("state_hash", v_str(state_hash))]),
    );
}

/// Session summary on shutdown
pub fn log_session_summary(duration_secs: f64, trips_completed: u64, ticks: u64, alerts: u64) {
    log(
        Level::Info,
        Domain::System,
        "session_summary",
        obj(&[
            ("duration_secs", v_num(duration_secs)),
            ("trips_completed", json!(trips_completed)),
            ("ticks", json!(ticks)),
            ("alerts", json!(alerts)),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn params_hash(input: &str) -> String {
    use std::hash::{Hash, Hasher};
    let mut h = std::collections::hash_map::DefaultHasher::new();
    input.hash(&mut h);
    format!("{:x}", h.finish())
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Profiling scope that emits structured timing on drop.
pub struct ProfileScope {
    label: &'static str,
    context: Option<Map<String, Value>>,
    started: Instant,
}

impl ProfileScope {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            context: None,
            started: Instant::now(),
        }
    }

    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        Self {
            label,
            context: Some(obj(fields)),
            started: Instant::now(),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = self.context.take().unwrap_or_default();
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(elapsed_ms));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn test_params_hash_deterministic() {
        assert_eq!(params_hash("city:200"), params_hash("city:200"));
        assert_ne!(params_hash("city:200"), params_hash("highway:200"));
    }

    #[test]
    fn test_obj_helper() {
        let m = obj(&[("key", v_str("value")), ("num", v_num(42.0))]);
        assert_eq!(m.get("key").unwrap(), "value");
        assert_eq!(m.get("num").unwrap(), 42.0);
    }

    #[test]
    fn test_split_fields_lifts_component() {
        let (top, data) = split_fields(obj(&[
            ("component", v_str("Tires")),
            ("health", v_num(39.5)),
        ]));
        assert_eq!(top.get("component").unwrap(), "Tires");
        assert!(data.contains_key("health"));
        assert!(!data.contains_key("component"));
    }

    #[test]
    fn test_echo_flag() {
        assert!(!echo_enabled(Some("0")));
        assert!(!echo_enabled(Some(" false ")));
        assert!(echo_enabled(Some("1")));
        assert!(!echo_enabled(None));
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }
}
