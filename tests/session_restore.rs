use scene_sim::{
    config::{EngineConfig, LightPhase, Road, Scenario, ScenarioCatalog, ScenarioPoint, TrafficLightSpec},
    engine::{Control, Engine},
    session::{FileSnapshotStore, MemorySnapshotStore, SessionSnapshot},
    simulation::{Mode, Vec2},
};
use anyhow::Result;
use std::time::Duration;

const FRAME: Duration = Duration::from_nanos(16_666_667);

fn catalog() -> ScenarioCatalog {
    ScenarioCatalog::new(vec![
        Scenario::new(
            "ring",
            vec![Road::new(
                vec![
                    ScenarioPoint::new(0.0, 0.0),
                    ScenarioPoint::new(400.0, 0.0),
                    ScenarioPoint::new(400.0, 200.0),
                    ScenarioPoint::new(0.0, 200.0),
                ],
                40.0,
            )],
            vec![TrafficLightSpec::new(400.0, 0.0, LightPhase::Green)],
        ),
        Scenario::new(
            "lane",
            vec![Road::new(vec![ScenarioPoint::new(-50.0, 10.0), ScenarioPoint::new(50.0, 10.0)], 30.0)],
            vec![],
        ),
    ])
}

fn engine_on(store: &MemorySnapshotStore) -> Engine {
    let mut config = EngineConfig::default();
    config.random.seed = Some(7);
    Engine::new(config).with_snapshot_store(Box::new(store.clone()))
}

#[test]
fn test_manual_session_resumes_after_teardown() -> Result<()> {
    let store = MemorySnapshotStore::new();

    let mut first = engine_on(&store);
    assert!(!first.load_scenarios(catalog()));
    first.select_scenario("ring")?;
    first.set_mode(Mode::Manual);
    first.start()?;
    first.press(Control::Accelerate);
    for _ in 0..90 {
        first.tick(FRAME);
    }
    let player = first.state().player.expect("player spawned");
    let camera = first.state().manual_camera;
    first.teardown();

    let snapshot: SessionSnapshot = serde_json::from_str(&store.blob().expect("snapshot saved"))?;
    assert!(snapshot.running);
    assert_eq!(snapshot.mode, Mode::Manual);

    let mut second = engine_on(&store);
    assert!(second.load_scenarios(catalog()));

    let state = second.state();
    assert_eq!(state.scenario_id.as_deref(), Some("ring"));
    assert_eq!(state.mode, Mode::Manual);
    assert!(state.running);
    assert_eq!(state.player, Some(player));
    assert_eq!(state.manual_camera, camera);

    // The resumed run keeps moving from where the first one left off
    second.press(Control::Accelerate);
    second.tick(FRAME);
    let moved = second.state().player.expect("player restored");
    assert!(moved.position.x > player.position.x);
    assert!(second.metrics().is_some());
    assert!(second.job_id().is_some());
    Ok(())
}

#[test]
fn test_ai_session_restores_vehicles_and_camera() -> Result<()> {
    let store = MemorySnapshotStore::new();

    let mut first = engine_on(&store);
    first.load_scenarios(catalog());
    first.select_scenario("ring")?;
    first.start()?;
    first.pointer_down(0.0, 0.0);
    first.pointer_move(-25.0, 40.0);
    first.pointer_up();
    first.zoom_out();
    for _ in 0..30 {
        first.tick(FRAME);
    }
    first.stop();

    let vehicles = first.state().ai_vehicles.clone();
    let camera = first.state().ai_camera;

    let mut second = engine_on(&store);
    assert!(second.load_scenarios(catalog()));

    let state = second.state();
    assert!(!state.running);
    assert_eq!(state.ai_vehicles, vehicles);
    // Restored pan and zoom win over centering on the network
    assert_eq!(state.ai_camera, camera);
    assert_eq!(state.ai_camera.offset, Vec2::new(-200.0 - 25.0, -100.0 + 40.0));
    Ok(())
}

#[test]
fn test_scenario_selection_centers_camera() -> Result<()> {
    let store = MemorySnapshotStore::new();
    let mut engine = engine_on(&store);
    engine.load_scenarios(catalog());
    engine.select_scenario("lane")?;

    assert_eq!(engine.state().ai_camera.offset, Vec2::new(0.0, -10.0));
    Ok(())
}

#[test]
fn test_periodic_snapshots_while_running() -> Result<()> {
    let store = MemorySnapshotStore::new();
    let mut engine = engine_on(&store);
    engine.load_scenarios(catalog());
    engine.select_scenario("ring")?;
    engine.start()?;

    for _ in 0..60 {
        engine.tick(FRAME);
    }
    assert!(store.blob().is_none());

    for _ in 0..40 {
        engine.tick(FRAME);
    }
    let snapshot: SessionSnapshot = serde_json::from_str(&store.blob().expect("snapshot after 1.5s"))?;
    assert!(snapshot.running);
    assert_eq!(snapshot.ai_vehicles.len(), 5);
    Ok(())
}

#[test]
fn test_malformed_snapshot_is_ignored() -> Result<()> {
    let store = MemorySnapshotStore::with_blob("{\"scenario_id\": \"ring\", \"mode\": ");
    let mut engine = engine_on(&store);

    assert!(!engine.load_scenarios(catalog()));
    assert!(engine.state().scenario_id.is_none());

    engine.select_scenario("lane")?;
    engine.start()?;
    assert!(engine.state().running);
    Ok(())
}

#[test]
fn test_snapshot_for_unknown_scenario_is_ignored() -> Result<()> {
    let store = MemorySnapshotStore::new();

    let mut first = engine_on(&store);
    first.load_scenarios(catalog());
    first.select_scenario("lane")?;
    first.start()?;
    first.teardown();

    let mut second = engine_on(&store);
    let only_ring = ScenarioCatalog::new(vec![catalog().scenarios.remove(0)]);
    assert!(!second.load_scenarios(only_ring));
    assert!(!second.state().running);
    Ok(())
}

#[test]
fn test_file_store_round_trip() -> Result<()> {
    let path = std::env::temp_dir().join(format!("scene-sim-snapshot-{}.json", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let mut config = EngineConfig::default();
    config.random.seed = Some(3);

    let mut first = Engine::new(config.clone()).with_snapshot_store(Box::new(FileSnapshotStore::new(&path)));
    assert!(!first.load_scenarios(catalog()));
    first.select_scenario("ring")?;
    first.start()?;
    for _ in 0..10 {
        first.tick(FRAME);
    }
    first.teardown();
    assert!(path.exists());

    let mut second = Engine::new(config).with_snapshot_store(Box::new(FileSnapshotStore::new(&path)));
    assert!(second.load_scenarios(catalog()));
    assert!(second.state().running);
    assert_eq!(second.state().ai_vehicles, first.state().ai_vehicles);

    std::fs::remove_file(&path)?;
    Ok(())
}
