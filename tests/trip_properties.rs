use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tripsim::engine::events::{ControlEvent, Event, SysEvent};
use tripsim::engine::reducer::{replay, ReducerConfig};
use tripsim::engine::state::{ComponentSeeds, SimulationRun};
use tripsim::engine::stepper::{degraded_health, DegradationSimulator, DistanceBasis};
use tripsim::risk::{classify, RiskLevel};
use tripsim::state::{Terrain, TripConfig};
use tripsim::verify::invariants::{assert_monotonic, assert_run_invariants};

fn random_trip(rng: &mut StdRng) -> TripConfig {
    let terrain = Terrain::ALL[rng.gen_range(0..Terrain::ALL.len())];
    TripConfig::new(rng.gen_range(50.0..=800.0), terrain)
}

fn run_to_end(sim: &DegradationSimulator, trip: &TripConfig) -> (SimulationRun, u32) {
    let mut run = sim.start(sim.reset());
    let mut ticks = 0;
    while run.running {
        let next = sim.tick(run.clone(), trip);
        assert_run_invariants(&next).unwrap();
        assert_monotonic(&run, &next).unwrap();
        assert_eq!(
            classify(&next.components) == RiskLevel::High,
            next.components.iter().any(|c| c.is_critical())
        );
        run = next;
        ticks += 1;
    }
    (run, ticks)
}

#[test]
fn test_every_trip_completes_in_100_ticks() {
    let mut rng = StdRng::seed_from_u64(7);
    for basis in [DistanceBasis::PreTick, DistanceBasis::PostTick] {
        let sim = DegradationSimulator::new(ComponentSeeds::default(), basis);
        for _ in 0..50 {
            let trip = random_trip(&mut rng);
            let (run, ticks) = run_to_end(&sim, &trip);
            assert_eq!(ticks, 100);
            assert_eq!(run.progress_pct, 100);
            assert!(!run.running);
        }
    }
}

#[test]
fn test_final_health_matches_closed_form() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..50 {
        let trip = random_trip(&mut rng);
        let mult = trip.terrain.multiplier();

        let pre = DegradationSimulator::new(ComponentSeeds::default(), DistanceBasis::PreTick);
        let (run, _) = run_to_end(&pre, &trip);
        for c in &run.components {
            let expected = degraded_health(c, 0.99 * trip.distance_km, mult);
            assert!((c.current_health - expected).abs() < 1e-9, "{}", c.name);
        }

        let post = DegradationSimulator::new(ComponentSeeds::default(), DistanceBasis::PostTick);
        let (run, _) = run_to_end(&post, &trip);
        for c in &run.components {
            let expected = degraded_health(c, trip.distance_km, mult);
            assert!((c.current_health - expected).abs() < 1e-9, "{}", c.name);
        }
    }
}

#[test]
fn test_warnings_follow_thresholds() {
    let mut rng = StdRng::seed_from_u64(3);
    let sim = DegradationSimulator::default();
    for _ in 0..50 {
        let trip = random_trip(&mut rng);
        let (run, _) = run_to_end(&sim, &trip);
        for c in &run.components {
            assert_eq!(c.is_critical(), run.warnings.contains(&c.name), "{}", c.name);
        }
    }
}

#[test]
fn test_reset_restores_seeds_from_any_point() {
    let mut rng = StdRng::seed_from_u64(5);
    let sim = DegradationSimulator::default();
    let fresh = SimulationRun::from_seeds(&ComponentSeeds::default());
    for _ in 0..20 {
        let trip = random_trip(&mut rng);
        let stop = rng.gen_range(0..=100);
        let mut run = sim.start(sim.reset());
        for _ in 0..stop {
            run = sim.tick(run, &trip);
        }
        assert_eq!(sim.reset(), fresh);
    }
}

#[test]
fn test_replay_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(13);
    let cfg = ReducerConfig::default();
    for _ in 0..10 {
        let mut events = Vec::new();
        let mut ts = 0;
        for _ in 0..300 {
            ts += rng.gen_range(0..50u64);
            let event = match rng.gen_range(0..20) {
                0 => Event::Control(ControlEvent::Start { ts }),
                1 => Event::Control(ControlEvent::Pause { ts }),
                2 => Event::Control(ControlEvent::Reset { ts }),
                3 => Event::Control(ControlEvent::Configure {
                    ts,
                    trip: random_trip(&mut rng),
                }),
                _ => Event::Sys(SysEvent::Tick { ts }),
            };
            events.push(event);
        }

        let trip = random_trip(&mut rng);
        let (a, cmds_a) = replay(events.clone(), trip, &cfg);
        let (b, cmds_b) = replay(events, trip, &cfg);
        assert_eq!(a.run.fingerprint(), b.run.fingerprint());
        assert_eq!(a.hash(), b.hash());
        assert_eq!(cmds_a, cmds_b);
        assert_run_invariants(&a.run).unwrap();
    }
}
