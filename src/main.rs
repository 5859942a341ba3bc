use anyhow::Result;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};

use tripsim::controller::ControllerCommand;
use tripsim::logging::{self, obj, params_hash, v_str, Domain, Level};
use tripsim::presenter::{JsonlPresenter, StatusPresenter};
use tripsim::scheduler::{SchedulerHandle, TripScheduler};
use tripsim::state::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    logging::log(
        Level::Info,
        Domain::System,
        "config",
        obj(&[
            ("distance_km", json!(cfg.distance_km)),
            ("terrain", v_str(cfg.terrain.as_str())),
            ("tick_ms", json!(cfg.tick_ms)),
            ("autostart", json!(cfg.autostart)),
            ("params_hash", v_str(&params_hash(&format!("{:?}", cfg)))),
        ]),
    );

    let (mut scheduler, handle) = TripScheduler::from_config(&cfg);
    if !cfg.quiet {
        scheduler = scheduler.with_presenter(Box::new(StatusPresenter::new()));
    }
    if let Some(path) = &cfg.frames_path {
        scheduler = scheduler.with_presenter(Box::new(JsonlPresenter::create(path)?));
    }
    let task = tokio::spawn(scheduler.run());

    if cfg.autostart {
        handle.start().await?;
        wait_for_finish(&handle).await?;
    } else {
        control_loop(&handle).await?;
    }

    // dropping the last handle closes the control channel and stops the task
    drop(handle);
    let state = task.await?;
    eprintln!(
        "[DONE] progress={}% warnings={:?} fingerprint={}",
        state.run.progress_pct,
        state.run.warnings,
        state.run.fingerprint()
    );
    Ok(())
}

async fn wait_for_finish(handle: &SchedulerHandle) -> Result<()> {
    let mut frames = handle.frames();
    loop {
        if frames.borrow_and_update().is_finished() {
            return Ok(());
        }
        frames.changed().await?;
    }
}

async fn control_loop(handle: &SchedulerHandle) -> Result<()> {
    eprintln!("commands: start | pause | reset | distance <km> | terrain <city|highway|mixed> | status | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let cmd = match ControllerCommand::parse(&line) {
            Ok(cmd) => cmd,
            Err(err) => {
                logging::log_control(line.trim(), false, &err.to_string());
                continue;
            }
        };
        if !cmd.apply(handle).await? {
            break;
        }
    }
    Ok(())
}
