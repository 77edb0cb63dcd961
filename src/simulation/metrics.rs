use super::{Point, PlayerVehicle, TrafficLightCycle};
use crate::config::{LightPhase, ViolationConfig};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::f32::consts::PI;
use std::time::Duration;

/// Running driving statistics of one manual run.
#[derive(Debug, Clone)]
pub struct MetricsAccumulator {
    config: ViolationConfig,
    pub off_road_count: u32,
    pub red_light_violations: u32,
    pub yellow_light_violations: u32,
    headings: VecDeque<f32>,
    pub max_speed: f32,
    speed_samples: Vec<f32>,
    last_position: Point,
    pub distance_traveled: f32,
    near_lights: HashSet<usize>,
    was_on_road: bool,
}

/// Totals computed once when a manual run stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivingSummary {
    pub off_road_count: u32,
    pub red_light_violations: u32,
    pub yellow_light_violations: u32,
    pub turn_smoothness_score: f32,
    pub duration_seconds: f32,
    pub max_speed: f32,
    pub avg_speed: f32,
    pub distance_traveled: f32,
}

impl MetricsAccumulator {
    pub fn new(config: ViolationConfig, start: Point, starts_on_road: bool) -> Self {
        let capacity = config.heading_history;
        Self {
            config,
            off_road_count: 0,
            red_light_violations: 0,
            yellow_light_violations: 0,
            headings: VecDeque::with_capacity(capacity),
            max_speed: 0.0,
            speed_samples: Vec::new(),
            last_position: start,
            distance_traveled: 0.0,
            near_lights: HashSet::new(),
            was_on_road: starts_on_road,
        }
    }

    /// Sample the vehicle after this tick's kinematics step.
    pub fn sample(&mut self, vehicle: &PlayerVehicle, on_road: bool, lights: &TrafficLightCycle) {
        self.track_surface(on_road);
        self.check_lights(&vehicle.position, lights);
        self.record_heading(vehicle.heading);
        self.record_speed(vehicle.speed);
        self.record_position(vehicle.position);
    }

    /// Count on-road → off-road transitions only.
    pub fn track_surface(&mut self, on_road: bool) {
        if !on_road && self.was_on_road {
            self.off_road_count += 1;
        }
        self.was_on_road = on_road;
    }

    /// Hysteresis: a light counts once when the vehicle enters the trigger
    /// radius, and is re-armed only after the vehicle leaves the release radius.
    pub fn check_lights(&mut self, position: &Point, lights: &TrafficLightCycle) {
        for (index, light) in lights.lights().iter().enumerate() {
            let Some(light_position) = light.position else {
                continue;
            };

            let distance = (position - light_position).magnitude();
            if distance < self.config.trigger_radius && !self.near_lights.contains(&index) {
                match light.phase {
                    LightPhase::Red => {
                        self.red_light_violations += 1;
                        log::info!("Red light violation at light {}", index);
                    }
                    LightPhase::Yellow => {
                        self.yellow_light_violations += 1;
                        log::info!("Yellow light violation at light {}", index);
                    }
                    LightPhase::Green => {}
                }
                self.near_lights.insert(index);
            } else if distance > self.config.release_radius {
                self.near_lights.remove(&index);
            }
        }
    }

    pub fn record_heading(&mut self, heading: f32) {
        if self.headings.len() >= self.config.heading_history {
            self.headings.pop_front();
        }
        self.headings.push_back(heading);
    }

    pub fn record_speed(&mut self, speed: f32) {
        let display = speed.abs() * self.config.speed_display_scale;
        self.max_speed = self.max_speed.max(display);
        self.speed_samples.push(display);
    }

    pub fn record_position(&mut self, position: Point) {
        self.distance_traveled += (position - self.last_position).magnitude();
        self.last_position = position;
    }

    pub fn headings(&self) -> impl Iterator<Item = f32> + '_ {
        self.headings.iter().copied()
    }

    pub fn average_speed(&self) -> f32 {
        if self.speed_samples.is_empty() {
            return 0.0;
        }
        self.speed_samples.iter().sum::<f32>() / self.speed_samples.len() as f32
    }

    pub fn sample_count(&self) -> usize {
        self.speed_samples.len()
    }

    pub fn smoothness_score(&self) -> f32 {
        smoothness_score(self.headings.iter().copied())
    }

    pub fn finalize(&self, duration: Duration) -> DrivingSummary {
        DrivingSummary {
            off_road_count: self.off_road_count,
            red_light_violations: self.red_light_violations,
            yellow_light_violations: self.yellow_light_violations,
            turn_smoothness_score: self.smoothness_score(),
            duration_seconds: duration.as_secs_f32(),
            max_speed: self.max_speed,
            avg_speed: self.average_speed(),
            distance_traveled: self.distance_traveled,
        }
    }
}

/// Angle between two headings folded into [0, π].
pub fn angular_difference(a: f32, b: f32) -> f32 {
    let diff = (a - b).abs().rem_euclid(2.0 * PI);
    if diff > PI { 2.0 * PI - diff } else { diff }
}

/// 0..=100 score from the mean heading change between consecutive samples.
/// Fewer than two samples is a perfect score.
pub fn smoothness_score<I>(headings: I) -> f32
where
    I: IntoIterator<Item = f32>,
{
    let headings: Vec<f32> = headings.into_iter().collect();
    if headings.len() < 2 {
        return 100.0;
    }

    let total: f32 = headings
        .windows(2)
        .map(|pair| angular_difference(pair[1], pair[0]))
        .sum();
    let mean_variation = total / headings.len() as f32;

    (100.0 - mean_variation * 1000.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angular_difference_folds_wraparound() {
        assert!((angular_difference(0.1, 2.0 * PI - 0.1) - 0.2).abs() < 1e-5);
        assert!((angular_difference(4.0 * PI + 0.3, 0.0) - 0.3).abs() < 1e-4);
        assert!((angular_difference(PI, 0.0) - PI).abs() < 1e-6);
    }

    #[test]
    fn heading_history_is_bounded() {
        let mut acc = MetricsAccumulator::new(ViolationConfig::default(), Point::origin(), true);
        for i in 0..250 {
            acc.record_heading(i as f32);
        }
        let kept: Vec<f32> = acc.headings().collect();
        assert_eq!(kept.len(), 100);
        assert_eq!(kept[0], 150.0);
    }

    #[test]
    fn speed_and_distance_accumulate() {
        let mut acc = MetricsAccumulator::new(ViolationConfig::default(), Point::origin(), true);
        acc.record_speed(2.0);
        acc.record_speed(-4.0);
        acc.record_position(Point::new(3.0, 4.0));
        acc.record_position(Point::new(3.0, 10.0));

        assert_eq!(acc.max_speed, 40.0);
        assert_eq!(acc.average_speed(), 30.0);
        assert_eq!(acc.distance_traveled, 11.0);
    }

    #[test]
    fn smoothness_extremes() {
        assert_eq!(smoothness_score(vec![1.2; 50]), 100.0);
        assert_eq!(smoothness_score(vec![0.7]), 100.0);

        let alternating = (0..50).map(|i| if i % 2 == 0 { 0.0 } else { PI });
        assert_eq!(smoothness_score(alternating), 0.0);
    }

    #[test]
    fn off_road_counts_transitions_only() {
        let mut acc = MetricsAccumulator::new(ViolationConfig::default(), Point::origin(), true);
        for on_road in [true, false, false, false, true, false, false] {
            acc.track_surface(on_road);
        }
        assert_eq!(acc.off_road_count, 2);

        let mut spawned_off = MetricsAccumulator::new(ViolationConfig::default(), Point::origin(), false);
        spawned_off.track_surface(false);
        assert_eq!(spawned_off.off_road_count, 0);
    }

    #[test]
    fn light_violation_rearms_past_release_radius() {
        use crate::config::{SignalTimings, TrafficLightSpec};

        let lights = TrafficLightCycle::new(
            &[TrafficLightSpec::new(0.0, 0.0, LightPhase::Red)],
            SignalTimings::default(),
        );
        let mut acc = MetricsAccumulator::new(ViolationConfig::default(), Point::origin(), true);

        for x in [100.0, 20.0, 10.0, 40.0, 20.0] {
            acc.check_lights(&Point::new(x, 0.0), &lights);
        }
        assert_eq!(acc.red_light_violations, 1);

        for x in [70.0, 20.0] {
            acc.check_lights(&Point::new(x, 0.0), &lights);
        }
        assert_eq!(acc.red_light_violations, 2);
        assert_eq!(acc.yellow_light_violations, 0);
    }
}
