use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use std::time::Duration;
use super::Validate;

/// Engine tuning. Every section falls back to the built-in constants, so an
/// empty TOML file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kinematics: KinematicsConfig,
    pub ai: AiConfig,
    pub signals: SignalTimings,
    pub violations: ViolationConfig,
    pub camera: CameraConfig,
    pub session: SessionConfig,
    pub random: RandomConfig,
    pub performance: PerformanceConfig,
}

/// Per-tick constants of the manually driven vehicle.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct KinematicsConfig {
    pub accel: f32,
    pub brake: f32,
    pub boost_multiplier: f32,
    pub turn_speed: f32,
    pub friction_road: f32,
    pub friction_grass: f32,
    pub max_speed: f32,
    pub max_speed_grass: f32,
    /// Below this speed steering input is ignored.
    pub steer_threshold: f32,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            accel: 0.13,
            brake: 0.35,
            boost_multiplier: 2.0,
            turn_speed: 0.05,
            friction_road: 0.98,
            friction_grass: 0.90,
            max_speed: 8.0,
            max_speed_grass: 3.5,
            steer_threshold: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AiConfig {
    pub vehicle_count: u32,
    pub tick_fraction: f32,
    pub base_speed: f32,
    pub speed_variance: f32,
    pub min_speed: f32,
    pub palette: Vec<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            vehicle_count: 5,
            tick_fraction: 0.1,
            base_speed: 2.0,
            speed_variance: 0.5,
            min_speed: 0.5,
            palette: ["#ef4444", "#3b82f6", "#10b981", "#f59e0b", "#8b5cf6", "#ec4899"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

/// Phase durations of the shared light cycle, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalTimings {
    pub red_ms: u64,
    pub green_ms: u64,
    pub yellow_ms: u64,
}

impl Default for SignalTimings {
    fn default() -> Self {
        Self {
            red_ms: 3000,
            green_ms: 3000,
            yellow_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ViolationConfig {
    pub trigger_radius: f32,
    pub release_radius: f32,
    pub heading_history: usize,
    /// Factor from per-tick speed units to the km/h readout.
    pub speed_display_scale: f32,
}

impl Default for ViolationConfig {
    fn default() -> Self {
        Self {
            trigger_radius: 25.0,
            release_radius: 60.0,
            heading_history: 100,
            speed_display_scale: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.2,
            max_zoom: 3.0,
            zoom_step: 1.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub snapshot_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { snapshot_interval_ms: 1500 }
    }
}

impl SessionConfig {
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RandomConfig {
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub target_fps: u32,
    pub timing_samples: u32,
    pub hud_interval_ms: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            timing_samples: 120,
            hud_interval_ms: 100,
        }
    }
}

impl PerformanceConfig {
    /// Fixed step handed to every tick.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps.max(1) as f64)
    }

    pub fn hud_interval(&self) -> Duration {
        Duration::from_millis(self.hud_interval_ms)
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        // Validate kinematics
        let k = &self.kinematics;
        if k.accel <= 0.0 || k.brake <= 0.0 || k.turn_speed <= 0.0 {
            return Err(anyhow!("Acceleration, brake and turn speed must be positive"));
        }

        if k.boost_multiplier < 0.0 {
            return Err(anyhow!("Boost multiplier must be non-negative"));
        }

        for (name, friction) in [("road", k.friction_road), ("grass", k.friction_grass)] {
            if friction <= 0.0 || friction > 1.0 {
                return Err(anyhow!("Friction coefficient for {} must be in range (0, 1]", name));
            }
        }

        if k.max_speed <= 0.0 || k.max_speed_grass <= 0.0 {
            return Err(anyhow!("Maximum speeds must be positive"));
        }

        if k.steer_threshold < 0.0 {
            return Err(anyhow!("Steering threshold must be non-negative"));
        }

        // Validate AI path following
        let ai = &self.ai;
        if ai.vehicle_count == 0 || ai.vehicle_count > 20 {
            return Err(anyhow!("AI vehicle count {} is out of range (1-20)", ai.vehicle_count));
        }

        if ai.tick_fraction <= 0.0 || ai.base_speed <= 0.0 {
            return Err(anyhow!("AI tick fraction and base speed must be positive"));
        }

        if ai.speed_variance < 0.0 || ai.min_speed <= 0.0 {
            return Err(anyhow!("AI speed variance must be non-negative and minimum speed positive"));
        }

        if ai.palette.is_empty() {
            return Err(anyhow!("AI color palette must not be empty"));
        }

        // Validate signal timing
        let s = &self.signals;
        if s.red_ms == 0 || s.green_ms == 0 || s.yellow_ms == 0 {
            return Err(anyhow!("Signal phase durations must be positive"));
        }

        // Validate violation detection
        let v = &self.violations;
        if v.trigger_radius <= 0.0 {
            return Err(anyhow!("Violation trigger radius must be positive"));
        }

        if v.release_radius <= v.trigger_radius {
            return Err(anyhow!("Violation release radius must exceed the trigger radius"));
        }

        if v.heading_history < 2 {
            return Err(anyhow!("Heading history must hold at least two samples"));
        }

        if v.speed_display_scale <= 0.0 {
            return Err(anyhow!("Speed display scale must be positive"));
        }

        // Validate camera
        let c = &self.camera;
        if c.min_zoom <= 0.0 || c.min_zoom > c.max_zoom {
            return Err(anyhow!("Camera zoom range [{}, {}] is invalid", c.min_zoom, c.max_zoom));
        }

        if c.zoom_step <= 1.0 {
            return Err(anyhow!("Camera zoom step must be greater than 1"));
        }

        if self.session.snapshot_interval_ms == 0 {
            return Err(anyhow!("Snapshot interval must be positive"));
        }

        // Validate performance config
        let perf = &self.performance;
        if perf.target_fps == 0 {
            return Err(anyhow!("Target fps must be greater than zero"));
        }

        if perf.timing_samples == 0 {
            return Err(anyhow!("Timing samples must be greater than zero"));
        }

        Ok(())
    }
}
