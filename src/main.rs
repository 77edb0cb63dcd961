use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use log::info;
use std::time::Duration;

use scene_sim::{
    config::SimulationConfig,
    engine::{Control, Engine, FrameControl, FrameScheduler},
    session::FileSnapshotStore,
    simulation::Mode,
};

#[derive(Parser)]
#[command(name = "scene-sim")]
#[command(about = "Road scene simulation with AI traffic, manual driving and driving metrics")]
struct Args {
    /// Scenario catalog (JSON)
    #[arg(long, default_value = "scenarios.json")]
    scenarios: String,

    /// Engine tuning file (TOML); built-in constants when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Scenario id to run; defaults to the first scenario in the catalog
    #[arg(long)]
    scenario: Option<String>,

    /// Simulation mode
    #[arg(short, long, value_enum, default_value_t = ModeArg::Ai)]
    mode: ModeArg,

    /// Simulated seconds to run before stopping
    #[arg(long, default_value_t = 60.0)]
    seconds: f64,

    /// Number of AI vehicles to spawn
    #[arg(long)]
    vehicles: Option<u32>,

    /// Random seed for reproducible AI traffic
    #[arg(short, long)]
    seed: Option<u64>,

    /// Controls held for the whole manual run, e.g. accelerate,steer-left
    #[arg(long, value_delimiter = ',')]
    hold: Vec<Control>,

    /// Session snapshot file; a stored running session is resumed
    #[arg(long)]
    snapshot: Option<String>,

    /// Pace frames at the target fps instead of running as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// AI vehicles follow the road network
    Ai,
    /// Drive one vehicle with held controls
    Manual,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Ai => Mode::Ai,
            ModeArg::Manual => Mode::Manual,
        }
    }
}

/// Simulated run length from `--seconds`; negative values mean zero.
fn run_duration(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds.max(0.0))
        .map_err(|e| anyhow!("Invalid --seconds value {}: {}", seconds, e))
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();
    info!("Starting scene simulation");

    let run_length = run_duration(args.seconds)?;

    let mut config = SimulationConfig::load_from_files(&args.scenarios, args.config.as_deref())?;
    info!(
        "Loaded {} scenarios from {}",
        config.scenarios.len(),
        &args.scenarios
    );

    if let Some(seed) = args.seed {
        config.engine.random.seed = Some(seed);
    }

    let mut engine = Engine::new(config.engine.clone());
    if let Some(count) = args.vehicles {
        engine.set_vehicle_count(count);
    }
    if let Some(path) = &args.snapshot {
        engine = engine.with_snapshot_store(Box::new(FileSnapshotStore::new(path)));
    }

    let restored = engine.load_scenarios(config.scenarios.clone());
    if !restored {
        let scenario_id = match &args.scenario {
            Some(id) => id.clone(),
            None => config
                .scenarios
                .first()
                .map(|s| s.id.clone())
                .ok_or_else(|| anyhow!("Scenario catalog {} is empty", &args.scenarios))?,
        };
        engine.select_scenario(&scenario_id)?;
        engine.set_mode(args.mode.into());
    }

    if !engine.state().running {
        engine.start()?;
    }

    for control in &args.hold {
        engine.press(*control);
    }
    if args.verbose && !args.hold.is_empty() {
        let held: Vec<String> = args.hold.iter().map(|c| c.to_string()).collect();
        info!("Holding controls: {}", held.join(", "));
    }

    let mut scheduler = FrameScheduler::new(&config.engine.performance)
        .realtime(args.realtime)
        .with_max_duration(run_length);

    let report = scheduler.run(&mut engine, |_| FrameControl::Continue, |_| {});

    info!(
        "Simulation ended: {} frames, {:.1}s simulated in {:.2}s ({:.1} avg FPS)",
        report.frames,
        report.simulated.as_secs_f64(),
        report.wall_time.as_secs_f64(),
        scheduler.tracker().fps()
    );

    if let Some(summary) = &report.summary {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!("{}", serde_json::to_string_pretty(engine.hud())?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_duration_rejects_unrepresentable_values() {
        assert_eq!(run_duration(1.5).unwrap(), Duration::from_millis(1500));
        assert_eq!(run_duration(-3.0).unwrap(), Duration::ZERO);
        assert!(run_duration(f64::INFINITY).is_err());
        assert!(run_duration(1e30).is_err());
    }
}
