use std::time::Duration;

use tokio::time::{sleep, timeout};

use tripsim::engine::reducer::ReducerConfig;
use tripsim::presenter::{Frame, JsonlPresenter};
use tripsim::risk::RiskLevel;
use tripsim::scheduler::{SchedulerHandle, TripScheduler};
use tripsim::state::{Terrain, TripConfig};

fn spawn(trip: TripConfig) -> (tokio::task::JoinHandle<tripsim::engine::state::EngineState>, SchedulerHandle) {
    let (scheduler, handle) = TripScheduler::new(ReducerConfig::default(), trip, 8);
    (tokio::spawn(scheduler.run()), handle)
}

async fn wait_until(handle: &SchedulerHandle, pred: impl Fn(&Frame) -> bool) -> Frame {
    let mut rx = handle.frames();
    let fut = async {
        loop {
            {
                let frame = rx.borrow_and_update();
                if pred(&frame) {
                    return frame.clone();
                }
            }
            rx.changed().await.expect("scheduler stopped");
        }
    };
    timeout(Duration::from_secs(600), fut).await.expect("frame never arrived")
}

#[tokio::test(start_paused = true)]
async fn test_run_to_completion() {
    let (task, handle) = spawn(TripConfig::new(200.0, Terrain::City));
    handle.start().await.unwrap();

    let frame = wait_until(&handle, |f| f.is_finished()).await;
    assert_eq!(frame.progress_pct, 100);
    assert!(!frame.running);
    assert_eq!(frame.components[0].name, "Front Brakes");
    assert_eq!(frame.components[0].health, 39);
    assert!(frame.alerts.is_empty());
    assert_eq!(frame.risk, RiskLevel::Medium);
    assert_eq!(frame.distance_covered_km, 200);

    drop(handle);
    let state = task.await.unwrap();
    assert!(!state.timer_armed);
    assert_eq!(state.run.progress_pct, 100);
}

#[tokio::test(start_paused = true)]
async fn test_paused_trip_makes_no_progress() {
    let (task, handle) = spawn(TripConfig::default());
    handle.start().await.unwrap();
    wait_until(&handle, |f| f.progress_pct >= 5).await;

    handle.pause().await.unwrap();
    let paused = wait_until(&handle, |f| !f.running).await;
    assert!(paused.progress_pct >= 5);

    sleep(Duration::from_secs(5)).await;
    let later = handle.latest();
    assert_eq!(later.progress_pct, paused.progress_pct);
    assert_eq!(later.components, paused.components);

    // starting again restarts from the seed values
    handle.start().await.unwrap();
    let restarted = wait_until(&handle, |f| f.running).await;
    assert!(restarted.progress_pct < paused.progress_pct);
    assert_eq!(restarted.components[0].health_raw, 58.0);

    drop(handle);
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_first_tick_waits_for_start_delay() {
    let (task, handle) = spawn(TripConfig::default());
    handle.start().await.unwrap();
    wait_until(&handle, |f| f.running).await;

    sleep(Duration::from_millis(120)).await;
    assert_eq!(handle.latest().progress_pct, 0);

    let frame = wait_until(&handle, |f| f.progress_pct >= 1).await;
    assert_eq!(frame.progress_pct, 1);

    drop(handle);
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reset_restores_seeds() {
    let (task, handle) = spawn(TripConfig::new(800.0, Terrain::City));
    handle.start().await.unwrap();
    wait_until(&handle, |f| !f.alerts.is_empty()).await;

    handle.reset().await.unwrap();
    let frame = wait_until(&handle, |f| !f.running).await;
    assert_eq!(frame.progress_pct, 0);
    assert!(frame.alerts.is_empty());
    assert_eq!(frame.components[0].health_raw, 58.0);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(handle.latest().progress_pct, 0);

    drop(handle);
    let state = task.await.unwrap();
    assert!(!state.timer_armed);
}

#[tokio::test(start_paused = true)]
async fn test_configure_locked_while_running() {
    let (task, handle) = spawn(TripConfig::default());
    handle.start().await.unwrap();
    wait_until(&handle, |f| f.running).await;

    handle.configure(TripConfig::new(800.0, Terrain::City)).await.unwrap();
    handle.pause().await.unwrap();
    let frame = wait_until(&handle, |f| !f.running).await;
    assert_eq!(frame.distance_km, 200.0);
    assert_eq!(frame.terrain, Terrain::Mixed);

    handle.configure(TripConfig::new(800.0, Terrain::City)).await.unwrap();
    let frame = wait_until(&handle, |f| f.terrain == Terrain::City).await;
    assert_eq!(frame.distance_km, 800.0);

    drop(handle);
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handles_stops_running_trip() {
    let (task, handle) = spawn(TripConfig::default());
    handle.start().await.unwrap();
    wait_until(&handle, |f| f.progress_pct >= 2).await;

    drop(handle);
    let state = timeout(Duration::from_secs(1), task)
        .await
        .expect("scheduler did not stop")
        .unwrap();
    assert!(state.run.progress_pct < 100);
}

#[tokio::test(start_paused = true)]
async fn test_commands_after_stop_fail() {
    let (task, handle) = spawn(TripConfig::default());
    task.abort();
    let _ = task.await;
    assert!(handle.start().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_jsonl_frames_written_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frames.jsonl");

    let (scheduler, handle) = TripScheduler::new(ReducerConfig::default(), TripConfig::new(800.0, Terrain::City), 8);
    let scheduler = scheduler.with_presenter(Box::new(JsonlPresenter::create(&path).unwrap()));
    let task = tokio::spawn(scheduler.run());

    handle.start().await.unwrap();
    wait_until(&handle, |f| f.is_finished()).await;
    drop(handle);
    task.await.unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let frames: Vec<Frame> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    // one frame for the start plus one per tick
    assert_eq!(frames.len(), 101);
    let last = frames.last().unwrap();
    assert_eq!(last.progress_pct, 100);
    assert_eq!(
        last.alerts,
        vec![
            "Front Brakes exceeded threshold",
            "Tires exceeded threshold",
            "Rear Brakes exceeded threshold",
        ]
    );
    assert_eq!(last.risk, RiskLevel::High);
    assert!(frames.windows(2).all(|w| w[0].seq < w[1].seq));
}
