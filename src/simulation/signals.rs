use super::Point;
use crate::config::{LightPhase, SignalTimings, TrafficLightSpec};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct SignalLight {
    /// `None` when the scenario omitted a coordinate.
    pub position: Option<Point>,
    pub phase: LightPhase,
}

/// Every light of a scenario shares one clock and shows the same phase.
#[derive(Debug, Clone)]
pub struct TrafficLightCycle {
    timings: SignalTimings,
    phase: LightPhase,
    last_transition: Duration,
    lights: Vec<SignalLight>,
}

impl TrafficLightCycle {
    /// The shared cycle starts from the first light's declared phase.
    pub fn new(specs: &[TrafficLightSpec], timings: SignalTimings) -> Self {
        let phase = specs.first().and_then(|s| s.state).unwrap_or_default();
        let lights = specs
            .iter()
            .map(|spec| SignalLight {
                position: spec.position(),
                phase,
            })
            .collect();

        Self {
            timings,
            phase,
            last_transition: Duration::ZERO,
            lights,
        }
    }

    pub fn duration(&self, phase: LightPhase) -> Duration {
        let ms = match phase {
            LightPhase::Red => self.timings.red_ms,
            LightPhase::Green => self.timings.green_ms,
            LightPhase::Yellow => self.timings.yellow_ms,
        };
        Duration::from_millis(ms)
    }

    /// Restart the current phase's dwell at `now`.
    pub fn reset_clock(&mut self, now: Duration) {
        self.last_transition = now;
    }

    /// Advance all lights once the current phase has lasted its full
    /// duration. The clock restarts at `now`, not at the scheduled boundary.
    /// Returns true when a transition happened.
    pub fn advance(&mut self, now: Duration) -> bool {
        let elapsed = now.saturating_sub(self.last_transition);
        if elapsed < self.duration(self.phase) {
            return false;
        }

        self.phase = self.phase.next();
        self.last_transition = now;
        for light in &mut self.lights {
            light.phase = self.phase;
        }

        log::debug!("Traffic lights switched to {} at {:?}", self.phase, now);
        true
    }

    pub fn phase(&self) -> LightPhase {
        self.phase
    }

    pub fn lights(&self) -> &[SignalLight] {
        &self.lights
    }

    pub fn phase_of(&self, index: usize) -> Option<LightPhase> {
        self.lights.get(index).map(|l| l.phase)
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(state: LightPhase) -> TrafficLightCycle {
        let specs = vec![
            TrafficLightSpec::new(0.0, 0.0, state),
            TrafficLightSpec::new(50.0, 0.0, LightPhase::Green),
        ];
        TrafficLightCycle::new(&specs, SignalTimings::default())
    }

    #[test]
    fn phases_follow_the_shared_clock() {
        let mut lights = cycle(LightPhase::Red);
        let mut seen = Vec::new();

        for ms in 0..=7000u64 {
            lights.advance(Duration::from_millis(ms));
            if [2999, 3000, 5999, 6000, 6499, 6500, 7000].contains(&ms) {
                seen.push(lights.phase());
            }
        }

        use LightPhase::*;
        assert_eq!(seen, vec![Red, Green, Green, Yellow, Yellow, Red, Red]);
        assert!(lights.lights().iter().all(|l| l.phase == Red));
    }

    #[test]
    fn first_light_sets_initial_phase() {
        let lights = cycle(LightPhase::Yellow);
        assert_eq!(lights.phase_of(1), Some(LightPhase::Yellow));

        let unspecified = TrafficLightCycle::new(
            &[TrafficLightSpec { x: None, y: Some(1.0), state: None }],
            SignalTimings::default(),
        );
        assert_eq!(unspecified.phase(), LightPhase::Red);
        assert!(unspecified.lights()[0].position.is_none());
    }

    #[test]
    fn late_sample_restarts_clock_at_sample_time() {
        let mut lights = cycle(LightPhase::Red);
        assert!(lights.advance(Duration::from_millis(3400)));
        assert_eq!(lights.phase(), LightPhase::Green);

        assert!(!lights.advance(Duration::from_millis(6300)));
        assert!(lights.advance(Duration::from_millis(6400)));
        assert_eq!(lights.phase(), LightPhase::Yellow);
    }
}
