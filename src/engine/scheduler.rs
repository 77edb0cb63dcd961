use std::time::{Duration, Instant};

use log::info;

use super::{Engine, FrameView};
use crate::config::PerformanceConfig;
use crate::simulation::DrivingSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameControl {
    Continue,
    Break,
}

#[derive(Debug, Clone, Default)]
pub struct FrameTiming {
    pub frame_time: Duration,
    pub simulation_time: Duration,
    pub render_time: Duration,
}

/// Rolling window of frame timings.
#[derive(Debug)]
pub struct PerformanceTracker {
    samples: Vec<FrameTiming>,
    max_samples: usize,
    current: FrameTiming,
    current_frame_start: Option<Instant>,
    current_sim_start: Option<Instant>,
    current_render_start: Option<Instant>,
}

impl PerformanceTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: Vec::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            current: FrameTiming::default(),
            current_frame_start: None,
            current_sim_start: None,
            current_render_start: None,
        }
    }

    pub fn start_frame(&mut self) {
        self.current = FrameTiming::default();
        self.current_frame_start = Some(Instant::now());
    }

    pub fn start_simulation(&mut self) {
        self.current_sim_start = Some(Instant::now());
    }

    pub fn end_simulation(&mut self) {
        if let Some(start) = self.current_sim_start.take() {
            self.current.simulation_time = start.elapsed();
        }
    }

    pub fn start_render(&mut self) {
        self.current_render_start = Some(Instant::now());
    }

    pub fn end_render(&mut self) {
        if let Some(start) = self.current_render_start.take() {
            self.current.render_time = start.elapsed();
        }
    }

    pub fn end_frame(&mut self) {
        if let Some(start) = self.current_frame_start.take() {
            self.current.frame_time = start.elapsed();

            if self.samples.len() >= self.max_samples {
                self.samples.remove(0);
            }
            self.samples.push(std::mem::take(&mut self.current));
        }
    }

    pub fn last_frame_time(&self) -> Duration {
        self.samples.last().map(|s| s.frame_time).unwrap_or(Duration::ZERO)
    }

    pub fn average_frame_time(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }

        let total: Duration = self.samples.iter().map(|s| s.frame_time).sum();
        total / self.samples.len() as u32
    }

    pub fn average_simulation_time(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }

        let total: Duration = self.samples.iter().map(|s| s.simulation_time).sum();
        total / self.samples.len() as u32
    }

    pub fn fps(&self) -> f32 {
        let avg_frame_time = self.average_frame_time();
        if avg_frame_time.is_zero() {
            return 0.0;
        }
        1.0 / avg_frame_time.as_secs_f32()
    }
}

/// Outcome of one scheduled run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub frames: u64,
    pub simulated: Duration,
    pub wall_time: Duration,
    pub summary: Option<DrivingSummary>,
}

/// Drives one engine tick per display frame at a fixed step.
pub struct FrameScheduler {
    frame_interval: Duration,
    realtime: bool,
    max_duration: Option<Duration>,
    tracker: PerformanceTracker,
}

impl FrameScheduler {
    pub fn new(performance: &PerformanceConfig) -> Self {
        Self {
            frame_interval: performance.frame_interval(),
            realtime: false,
            max_duration: None,
            tracker: PerformanceTracker::new(performance.timing_samples as usize),
        }
    }

    /// Sleep between frames to hold the target rate.
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Cancel the run after this much simulated time.
    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn tracker(&self) -> &PerformanceTracker {
        &self.tracker
    }

    /// Tick `engine` until the run stops, `before_tick` breaks, or the
    /// maximum duration elapses; then stop the engine, which flushes metrics
    /// and the final snapshot.
    pub fn run<B, R>(&mut self, engine: &mut Engine, mut before_tick: B, mut render: R) -> RunReport
    where
        B: FnMut(&mut Engine) -> FrameControl,
        R: FnMut(&FrameView<'_>),
    {
        let dt = self.frame_interval;
        let start_time = Instant::now();
        let mut simulated = Duration::ZERO;
        let mut next_status = Duration::from_secs(1);
        let mut frames = 0u64;

        while engine.state().running {
            if self.max_duration.is_some_and(|max| simulated >= max) {
                break;
            }

            self.tracker.start_frame();
            if before_tick(engine) == FrameControl::Break {
                break;
            }

            self.tracker.start_simulation();
            engine.tick(dt);
            self.tracker.end_simulation();

            self.tracker.start_render();
            render(&engine.frame());
            self.tracker.end_render();

            self.tracker.end_frame();

            frames += 1;
            simulated += dt;

            if simulated >= next_status {
                let hud = engine.hud();
                info!(
                    "Frame {}: {} vehicles, {:.1} km/h, lights {}, {:.1} FPS, Sim: {:.3}ms",
                    frames,
                    hud.vehicle_count,
                    hud.speed_kmh,
                    hud.light_phase.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
                    self.tracker.fps(),
                    self.tracker.average_simulation_time().as_secs_f64() * 1000.0,
                );
                next_status += Duration::from_secs(1);
            }

            if self.realtime {
                let elapsed = self.tracker.last_frame_time();
                if elapsed < dt {
                    std::thread::sleep(dt - elapsed);
                }
            }
        }

        let summary = engine.stop();

        RunReport {
            frames,
            simulated,
            wall_time: start_time.elapsed(),
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_keeps_bounded_window() {
        let mut tracker = PerformanceTracker::new(3);
        assert_eq!(tracker.fps(), 0.0);

        for _ in 0..5 {
            tracker.start_frame();
            tracker.start_simulation();
            tracker.end_simulation();
            tracker.end_frame();
        }

        assert_eq!(tracker.samples.len(), 3);
        assert!(tracker.average_simulation_time() <= tracker.average_frame_time());
    }

    #[test]
    fn frame_interval_follows_target_fps() {
        let config = PerformanceConfig {
            target_fps: 50,
            ..PerformanceConfig::default()
        };
        let scheduler = FrameScheduler::new(&config);
        assert_eq!(scheduler.frame_interval(), Duration::from_millis(20));
    }
}
