use nalgebra::{Vector2, Point2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub mod camera;
pub mod metrics;
pub mod physics;
pub mod road;
pub mod signals;
pub mod traffic;

pub use camera::*;
pub use metrics::*;
pub use physics::*;
pub use road::*;
pub use signals::*;
pub use traffic::*;

pub type Vec2 = Vector2<f32>;
pub type Point = Point2<f32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub usize);

/// Which replay the engine is running. Serialized with the job API's names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    #[serde(rename = "ai_simulation")]
    Ai,
    #[serde(rename = "manual_driving")]
    Manual,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Ai => f.write_str("ai_simulation"),
            Mode::Manual => f.write_str("manual_driving"),
        }
    }
}

/// The single manually driven vehicle.
///
/// `heading` is left unnormalized; only smoothness scoring folds it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerVehicle {
    pub position: Point,
    pub heading: f32,
    pub speed: f32,
}

impl PlayerVehicle {
    pub fn new(position: Point, heading: f32) -> Self {
        Self { position, heading, speed: 0.0 }
    }

    pub fn direction(&self) -> Vec2 {
        Vec2::new(self.heading.cos(), self.heading.sin())
    }
}

/// An autonomous vehicle riding the flattened segment list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiVehicle {
    pub id: VehicleId,
    pub segment: usize,
    pub progress: f32,
    pub speed: f32,
    pub color: String,
}

#[derive(Debug, Clone)]
pub struct SimulationState {
    pub scenario_id: Option<String>,
    pub mode: Mode,
    pub running: bool,
    /// Simulated time since the current run started.
    pub time: Duration,
    pub frame: u64,
    pub player: Option<PlayerVehicle>,
    pub manual_camera: CameraState,
    pub ai_vehicles: Vec<AiVehicle>,
    pub ai_camera: CameraState,
    pub total_spawned: u32,
}

impl Default for SimulationState {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationState {
    pub fn new() -> Self {
        Self {
            scenario_id: None,
            mode: Mode::Ai,
            running: false,
            time: Duration::ZERO,
            frame: 0,
            player: None,
            manual_camera: CameraState::default(),
            ai_vehicles: Vec::new(),
            ai_camera: CameraState::default(),
            total_spawned: 0,
        }
    }

    pub fn add_ai_vehicle(&mut self, vehicle: AiVehicle) {
        self.ai_vehicles.push(vehicle);
        self.total_spawned += 1;
    }

    pub fn get_ai_vehicle(&self, id: VehicleId) -> Option<&AiVehicle> {
        self.ai_vehicles.iter().find(|v| v.id == id)
    }

    /// Vehicles currently on screen: the AI fleet, or the player car.
    pub fn active_vehicles(&self) -> usize {
        match self.mode {
            Mode::Ai => self.ai_vehicles.len(),
            Mode::Manual => usize::from(self.player.is_some()),
        }
    }

    pub fn camera(&self) -> &CameraState {
        match self.mode {
            Mode::Ai => &self.ai_camera,
            Mode::Manual => &self.manual_camera,
        }
    }

    pub fn clear_vehicles(&mut self) {
        self.player = None;
        self.ai_vehicles.clear();
    }

    pub fn current_speed(&self) -> f32 {
        self.player.map(|p| p.speed).unwrap_or(0.0)
    }
}
