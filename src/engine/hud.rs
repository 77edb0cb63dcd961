use serde::Serialize;
use std::time::Duration;

use crate::config::LightPhase;
use crate::simulation::{Mode, SimulationState, TrafficLightCycle};

/// The slice of state a status panel or speed readout needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HudView {
    pub mode: Mode,
    pub running: bool,
    pub speed_kmh: f32,
    pub vehicle_count: usize,
    pub light_phase: Option<LightPhase>,
    pub elapsed_seconds: f32,
}

/// Copies state into a `HudView` at most once per interval of simulated time.
#[derive(Debug, Clone)]
pub struct HudProjector {
    interval: Duration,
    since_last: Duration,
    speed_scale: f32,
    view: HudView,
}

impl HudProjector {
    pub fn new(interval: Duration, speed_scale: f32) -> Self {
        Self {
            interval,
            since_last: Duration::ZERO,
            speed_scale,
            view: HudView::default(),
        }
    }

    pub fn view(&self) -> &HudView {
        &self.view
    }

    /// Returns true when the view was refreshed this call.
    pub fn tick(&mut self, dt: Duration, state: &SimulationState, lights: &TrafficLightCycle) -> bool {
        self.since_last += dt;
        if self.since_last < self.interval {
            return false;
        }
        self.refresh(state, lights);
        true
    }

    pub fn refresh(&mut self, state: &SimulationState, lights: &TrafficLightCycle) {
        self.since_last = Duration::ZERO;
        self.view = HudView {
            mode: state.mode,
            running: state.running,
            speed_kmh: state.current_speed().abs() * self.speed_scale,
            vehicle_count: state.active_vehicles(),
            light_phase: (!lights.is_empty()).then(|| lights.phase()),
            elapsed_seconds: state.time.as_secs_f32(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SignalTimings;
    use crate::simulation::{Point, PlayerVehicle};

    #[test]
    fn refresh_is_throttled_by_simulated_time() {
        let mut hud = HudProjector::new(Duration::from_millis(100), 10.0);
        let lights = TrafficLightCycle::new(&[], SignalTimings::default());
        let mut state = SimulationState::new();
        state.mode = Mode::Manual;
        state.running = true;
        let mut player = PlayerVehicle::new(Point::origin(), 0.0);
        player.speed = -2.5;
        state.player = Some(player);

        assert!(!hud.tick(Duration::from_millis(60), &state, &lights));
        assert_eq!(hud.view().speed_kmh, 0.0);

        assert!(hud.tick(Duration::from_millis(40), &state, &lights));
        assert_eq!(hud.view().speed_kmh, 25.0);
        assert_eq!(hud.view().vehicle_count, 1);
        assert_eq!(hud.view().light_phase, None);
    }
}
