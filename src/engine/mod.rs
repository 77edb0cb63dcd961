//! The scene engine: one mutable `SimulationState` advanced by `Engine::tick`.
//!
//! `tick` is the only place state changes during a run. Input events land in
//! buffers and are consumed at the next tick, so the same engine can be driven
//! by the live `FrameScheduler` or step by step from a test.

use std::time::Duration;

use crate::collab::{
    DrivingMetricsRecord, JobId, JobRequest, JobService, LocalJobService, LogMetricsSink, MetricsSink,
};
use crate::config::{EngineConfig, Scenario, ScenarioCatalog, Validate};
use crate::error::{EngineError, EngineResult};
use crate::session::{MemorySnapshotStore, SessionManager, SnapshotStore};
use crate::simulation::{
    vehicle_pose, AiVehicle, CameraController, CameraState, DrivingSummary, MetricsAccumulator, Mode,
    PhysicsEngine, PlayerVehicle, Point, RoadNetwork, SignalLight, SimulationState, TrafficLightCycle,
    TrafficManager,
};

pub mod hud;
pub mod input;
pub mod scheduler;

pub use hud::*;
pub use input::*;
pub use scheduler::*;

pub struct Engine {
    config: EngineConfig,
    catalog: ScenarioCatalog,
    scenario: Option<Scenario>,
    state: SimulationState,
    network: RoadNetwork,
    lights: TrafficLightCycle,
    physics: PhysicsEngine,
    traffic: TrafficManager,
    metrics: Option<MetricsAccumulator>,
    camera: CameraController,
    input: InputBuffer,
    session: SessionManager,
    hud: HudProjector,
    jobs: Box<dyn JobService>,
    sink: Box<dyn MetricsSink>,
    job_id: Option<JobId>,
    vehicle_count: u32,
    skip_auto_center: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let session = SessionManager::new(
            Box::new(MemorySnapshotStore::new()),
            config.session.snapshot_interval(),
        );
        let hud = HudProjector::new(
            config.performance.hud_interval(),
            config.violations.speed_display_scale,
        );

        Self {
            catalog: ScenarioCatalog::default(),
            scenario: None,
            state: SimulationState::new(),
            network: RoadNetwork::default(),
            lights: TrafficLightCycle::new(&[], config.signals),
            physics: PhysicsEngine::new(config.kinematics.clone()),
            traffic: TrafficManager::new(config.ai.clone(), config.random.seed),
            metrics: None,
            camera: CameraController::new(config.camera.clone()),
            input: InputBuffer::default(),
            session,
            hud,
            jobs: Box::new(LocalJobService::default()),
            sink: Box::new(LogMetricsSink),
            job_id: None,
            vehicle_count: config.ai.vehicle_count,
            skip_auto_center: false,
            config,
        }
    }

    pub fn with_snapshot_store(mut self, store: Box<dyn SnapshotStore>) -> Self {
        self.session.set_store(store);
        self
    }

    pub fn with_job_service(mut self, jobs: Box<dyn JobService>) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_metrics_sink(mut self, sink: Box<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Accept the authored scenario list and try to resume a stored session.
    /// Returns true when a snapshot was restored.
    pub fn load_scenarios(&mut self, catalog: ScenarioCatalog) -> bool {
        self.catalog = catalog;
        log::info!("Loaded {} scenarios", self.catalog.len());

        let Some(snapshot) = self.session.restore(|id| self.catalog.contains(id)) else {
            return false;
        };

        log::info!(
            "Restoring {} session for scenario {} (running: {})",
            snapshot.mode, snapshot.scenario_id, snapshot.running
        );

        self.skip_auto_center = true;
        if let Err(e) = self.select_scenario(&snapshot.scenario_id) {
            log::warn!("Could not restore session: {}", e);
            self.skip_auto_center = false;
            return false;
        }

        snapshot.apply_to(&mut self.state);
        if self.state.running {
            self.resume_run();
        }
        self.hud.refresh(&self.state, &self.lights);
        true
    }

    /// Make `id` the active scenario and rebuild its road network. A running
    /// run is stopped first.
    pub fn select_scenario(&mut self, id: &str) -> EngineResult<()> {
        let scenario = self
            .catalog
            .find(id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownScenario(id.to_string()))?;

        if self.state.running {
            self.stop();
        }

        self.network = RoadNetwork::compile(&scenario.roads);
        self.lights = TrafficLightCycle::new(&scenario.traffic_lights, self.config.signals);

        if self.skip_auto_center {
            self.skip_auto_center = false;
        } else if let Some(centroid) = self.network.centroid() {
            self.state.ai_camera.center_on(&centroid);
        }

        log::info!(
            "Selected scenario '{}' ({} segments, {} lights)",
            scenario.display_name(),
            self.network.len(),
            self.lights.len()
        );

        self.state.scenario_id = Some(scenario.id.clone());
        self.scenario = Some(scenario);
        Ok(())
    }

    /// Switching mode cancels a running run.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.state.mode == mode {
            return;
        }
        if self.state.running {
            self.stop();
        }
        self.camera.clear();
        self.input.clear();
        self.state.mode = mode;
        self.hud.refresh(&self.state, &self.lights);
    }

    pub fn set_vehicle_count(&mut self, count: u32) {
        self.vehicle_count = count;
    }

    pub fn start(&mut self) -> EngineResult<()> {
        let scenario = self.scenario.clone().ok_or(EngineError::NoScenario)?;
        if self.state.running {
            return Ok(());
        }

        let mut request = JobRequest::new(&scenario.id, self.state.mode);
        request.vehicle_count = self.vehicle_count;
        request
            .validate()
            .map_err(|e| EngineError::InvalidJob(e.to_string()))?;

        self.job_id = self.create_job(&request);
        self.reset_clocks();

        match self.state.mode {
            Mode::Manual => {
                let player = PhysicsEngine::spawn_player(&scenario.roads);
                let on_road = self.network.is_on_road(&player.position);
                self.metrics = Some(MetricsAccumulator::new(
                    self.config.violations.clone(),
                    player.position,
                    on_road,
                ));
                self.state.manual_camera.follow(&player.position);
                self.state.player = Some(player);
            }
            Mode::Ai => {
                self.network = RoadNetwork::compile(&scenario.roads);
                self.state.ai_vehicles.clear();
                self.traffic.spawn(&mut self.state, &self.network, self.vehicle_count);
            }
        }

        self.state.running = true;
        self.hud.refresh(&self.state, &self.lights);
        log::info!("Started {} run on scenario {}", self.state.mode, request.scenario_id);
        Ok(())
    }

    /// Continue a run restored from a snapshot. Vehicles come from the
    /// snapshot; metrics start fresh from the restored position.
    fn resume_run(&mut self) {
        let Some(scenario_id) = self.state.scenario_id.clone() else {
            return;
        };

        let request = JobRequest {
            vehicle_count: self.vehicle_count,
            ..JobRequest::new(scenario_id, self.state.mode)
        };
        self.job_id = self.create_job(&request);
        self.reset_clocks();

        if self.state.mode == Mode::Manual {
            let player = *self
                .state
                .player
                .get_or_insert_with(|| PlayerVehicle::new(Point::origin(), 0.0));
            let on_road = self.network.is_on_road(&player.position);
            self.metrics = Some(MetricsAccumulator::new(
                self.config.violations.clone(),
                player.position,
                on_road,
            ));
        }
        log::info!("Resumed {} run", self.state.mode);
    }

    /// Stop the run, submit manual-driving metrics and save a final snapshot.
    /// Returns the driving summary of a manual run.
    pub fn stop(&mut self) -> Option<DrivingSummary> {
        let summary = self.finish_run()?;
        self.session.save(&self.state);
        summary
    }

    /// Navigation away: save the snapshot with the run still marked running
    /// so the next load resumes it, then flush metrics.
    pub fn teardown(&mut self) -> Option<DrivingSummary> {
        self.session.save(&self.state);
        self.finish_run().flatten()
    }

    /// Stop and destroy all vehicles.
    pub fn reset(&mut self) {
        self.stop();
        self.state.clear_vehicles();
        self.state.manual_camera.reset();
        self.state.time = Duration::ZERO;
        self.state.frame = 0;
        self.input.clear();
        self.hud.refresh(&self.state, &self.lights);
        log::info!("Simulation reset");
    }

    /// `None` when nothing was running, `Some(None)` for a run without metrics.
    fn finish_run(&mut self) -> Option<Option<DrivingSummary>> {
        if !self.state.running {
            return None;
        }
        self.state.running = false;
        self.input.clear();

        let summary = self.metrics.take().map(|m| m.finalize(self.state.time));
        let job_id = self.job_id.take();

        if let Some(summary) = &summary {
            self.submit_metrics(job_id, summary);
        }

        self.hud.refresh(&self.state, &self.lights);
        log::info!(
            "Stopped {} run after {:.1}s ({} frames)",
            self.state.mode,
            self.state.time.as_secs_f32(),
            self.state.frame
        );
        Some(summary)
    }

    fn reset_clocks(&mut self) {
        self.state.time = Duration::ZERO;
        self.state.frame = 0;
        self.lights.reset_clock(Duration::ZERO);
        self.session.reset_timer();
    }

    fn create_job(&mut self, request: &JobRequest) -> Option<JobId> {
        match self.jobs.create_job(request) {
            Ok(id) => {
                log::info!("Job {} created for {} run", id, request.simulation_type);
                Some(id)
            }
            Err(e) => {
                log::warn!("Job creation failed, running locally: {}", e);
                None
            }
        }
    }

    fn submit_metrics(&mut self, job_id: Option<JobId>, summary: &DrivingSummary) {
        let (Some(job_id), Some(scenario_id)) = (job_id, self.state.scenario_id.clone()) else {
            log::warn!("No job id for this run, driving metrics kept local");
            return;
        };

        let record = DrivingMetricsRecord::new(job_id, scenario_id, summary);
        if let Err(e) = self.sink.submit(&record) {
            log::warn!("Driving metrics submission failed: {}", e);
        }
    }

    /// Advance the simulation by one frame. `dt` moves the simulated clock
    /// (lights, snapshots, HUD); kinematics use fixed per-tick constants.
    pub fn tick(&mut self, dt: Duration) -> &SimulationState {
        if self.state.mode == Mode::Ai {
            self.camera.apply(&mut self.state.ai_camera);
        }

        if !self.state.running {
            self.hud.tick(dt, &self.state, &self.lights);
            return &self.state;
        }

        let tick_start = self.state.time;
        self.state.time += dt;
        self.state.frame += 1;

        if self.state.mode == Mode::Manual {
            let controls = self.input.controls();
            if let Some(player) = self.state.player.as_mut() {
                // Surface under the car picks friction; metrics sample where it ends up
                let on_road = self.network.is_on_road(&player.position);
                self.physics.step(player, &controls, on_road);
                if let Some(metrics) = self.metrics.as_mut() {
                    let ends_on_road = self.network.is_on_road(&player.position);
                    metrics.sample(player, ends_on_road, &self.lights);
                }
                self.state.manual_camera.follow(&player.position);
            }
        }

        // Lights see the clock as it stood when this tick began
        self.lights.advance(tick_start);

        if self.state.mode == Mode::Ai {
            self.traffic.update(&mut self.state, &self.network);
        }

        self.session.on_tick(&self.state, dt);
        self.hud.tick(dt, &self.state, &self.lights);
        &self.state
    }

    pub fn press(&mut self, control: Control) {
        self.input.press(control);
    }

    pub fn release(&mut self, control: Control) {
        self.input.release(control);
    }

    /// Key events by name; unbound keys are ignored.
    pub fn key_down(&mut self, key: &str) {
        self.input.key_down(key);
    }

    pub fn key_up(&mut self, key: &str) {
        self.input.key_up(key);
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        if self.state.mode == Mode::Ai {
            self.camera.pointer_down(x, y);
        }
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if self.state.mode == Mode::Ai {
            self.camera.pointer_move(x, y);
        }
    }

    pub fn pointer_up(&mut self) {
        self.camera.pointer_up();
    }

    pub fn wheel(&mut self, delta_y: f32) {
        if self.state.mode == Mode::Ai {
            self.camera.wheel(delta_y);
        }
    }

    pub fn zoom_in(&mut self) {
        if self.state.mode == Mode::Ai {
            self.camera.zoom_in();
        }
    }

    pub fn zoom_out(&mut self) {
        if self.state.mode == Mode::Ai {
            self.camera.zoom_out();
        }
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scenario(&self) -> Option<&Scenario> {
        self.scenario.as_ref()
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn lights(&self) -> &TrafficLightCycle {
        &self.lights
    }

    pub fn metrics(&self) -> Option<&MetricsAccumulator> {
        self.metrics.as_ref()
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }

    pub fn hud(&self) -> &HudView {
        self.hud.view()
    }

    /// Read-only view for the render pass.
    pub fn frame(&self) -> FrameView<'_> {
        FrameView {
            mode: self.state.mode,
            camera: self.state.camera(),
            network: &self.network,
            lights: self.lights.lights(),
            player: self.state.player.as_ref(),
            ai_vehicles: &self.state.ai_vehicles,
        }
    }
}

/// Everything the render pass draws, borrowed from the engine.
pub struct FrameView<'a> {
    pub mode: Mode,
    pub camera: &'a CameraState,
    pub network: &'a RoadNetwork,
    pub lights: &'a [SignalLight],
    pub player: Option<&'a PlayerVehicle>,
    pub ai_vehicles: &'a [AiVehicle],
}

impl<'a> FrameView<'a> {
    /// World position and heading of each AI vehicle.
    pub fn ai_poses(&self) -> impl Iterator<Item = (&'a AiVehicle, Point, f32)> + '_ {
        self.ai_vehicles.iter().filter_map(move |vehicle| {
            vehicle_pose(vehicle, self.network).map(|(position, heading)| (vehicle, position, heading))
        })
    }
}
