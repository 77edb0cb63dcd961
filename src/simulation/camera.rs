use super::{Point, Vec2};
use crate::config::CameraConfig;
use serde::{Deserialize, Serialize};

/// Pan offset and zoom of one mode's view.
///
/// The screen transform is `screen = (world + offset) * zoom + viewport_center`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub offset: Vec2,
    pub zoom: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            offset: Vec2::zeros(),
            zoom: 1.0,
        }
    }
}

/// Pixel size of the surface being drawn on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

impl CameraState {
    /// Manual mode: keep the vehicle in the middle of the view at zoom 1.
    pub fn follow(&mut self, position: &Point) {
        self.offset = -position.coords;
        self.zoom = 1.0;
    }

    /// Frame the network by moving its centroid to the view center.
    pub fn center_on(&mut self, centroid: &Point) {
        self.offset = -centroid.coords;
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    pub fn zoom_by(&mut self, factor: f32, min_zoom: f32, max_zoom: f32) {
        self.zoom = (self.zoom * factor).clamp(min_zoom, max_zoom);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn world_to_screen(&self, world: &Point, viewport: &Viewport) -> Vec2 {
        (world.coords + self.offset) * self.zoom + viewport.center()
    }

    pub fn screen_to_world(&self, screen: Vec2, viewport: &Viewport) -> Point {
        Point::from((screen - viewport.center()) / self.zoom - self.offset)
    }
}

/// Buffers pointer and zoom input between ticks and applies it to the AI
/// camera at the next tick boundary.
#[derive(Debug, Clone)]
pub struct CameraController {
    config: CameraConfig,
    is_dragging: bool,
    last_pointer: Vec2,
    pending_pan: Vec2,
    pending_zoom_steps: i32,
}

impl CameraController {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            is_dragging: false,
            last_pointer: Vec2::zeros(),
            pending_pan: Vec2::zeros(),
            pending_zoom_steps: 0,
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.is_dragging = true;
        self.last_pointer = Vec2::new(x, y);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let pointer = Vec2::new(x, y);
        if self.is_dragging {
            self.pending_pan += pointer - self.last_pointer;
        }
        self.last_pointer = pointer;
    }

    pub fn pointer_up(&mut self) {
        self.is_dragging = false;
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    /// Scroll up (negative delta) zooms in, scroll down zooms out.
    pub fn wheel(&mut self, delta_y: f32) {
        if delta_y < 0.0 {
            self.zoom_in();
        } else if delta_y > 0.0 {
            self.zoom_out();
        }
    }

    pub fn zoom_in(&mut self) {
        self.pending_zoom_steps += 1;
    }

    pub fn zoom_out(&mut self) {
        self.pending_zoom_steps -= 1;
    }

    pub fn has_pending(&self) -> bool {
        self.pending_zoom_steps != 0 || self.pending_pan != Vec2::zeros()
    }

    /// Drop buffered input, e.g. when the mode changes under it.
    pub fn clear(&mut self) {
        self.is_dragging = false;
        self.pending_pan = Vec2::zeros();
        self.pending_zoom_steps = 0;
    }

    /// Apply buffered drag and zoom steps. Each step is clamped on its own,
    /// so zooming past a limit and back behaves like discrete wheel clicks.
    pub fn apply(&mut self, camera: &mut CameraState) {
        camera.pan(self.pending_pan);
        self.pending_pan = Vec2::zeros();

        let step = self.config.zoom_step;
        let factor = if self.pending_zoom_steps > 0 { step } else { 1.0 / step };
        for _ in 0..self.pending_zoom_steps.unsigned_abs() {
            camera.zoom_by(factor, self.config.min_zoom, self.config.max_zoom);
        }
        self.pending_zoom_steps = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_translates_one_to_one() {
        let mut controller = CameraController::new(CameraConfig::default());
        let mut camera = CameraState::default();

        controller.pointer_move(5.0, 5.0);
        controller.pointer_down(10.0, 10.0);
        controller.pointer_move(30.0, 0.0);
        controller.pointer_move(40.0, 5.0);
        controller.pointer_up();
        controller.pointer_move(100.0, 100.0);
        controller.apply(&mut camera);

        assert_eq!(camera.offset, Vec2::new(30.0, -5.0));
    }

    #[test]
    fn zoom_steps_are_clamped() {
        let mut controller = CameraController::new(CameraConfig::default());
        let mut camera = CameraState::default();

        for _ in 0..40 {
            controller.wheel(-1.0);
        }
        controller.apply(&mut camera);
        assert_eq!(camera.zoom, 3.0);

        for _ in 0..60 {
            controller.zoom_out();
        }
        controller.apply(&mut camera);
        assert_eq!(camera.zoom, 0.2);

        controller.zoom_in();
        controller.apply(&mut camera);
        assert!((camera.zoom - 0.22).abs() < 1e-6);
    }

    #[test]
    fn screen_transform_round_trips() {
        let camera = CameraState {
            offset: Vec2::new(-100.0, 50.0),
            zoom: 2.0,
        };
        let viewport = Viewport::new(800.0, 600.0);
        let world = Point::new(120.0, -30.0);

        let screen = camera.world_to_screen(&world, &viewport);
        assert_eq!(screen, Vec2::new(440.0, 340.0));
        assert_eq!(camera.screen_to_world(screen, &viewport), world);
    }
}
