use super::{Point, PlayerVehicle};
use crate::config::{KinematicsConfig, Road};

/// Buttons held during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlInput {
    pub accelerate: bool,
    pub brake: bool,
    pub boost: bool,
    pub steer_left: bool,
    pub steer_right: bool,
}

impl ControlInput {
    /// -1 for left, +1 for right, 0 when neither or both are held.
    pub fn steering(&self) -> f32 {
        match (self.steer_left, self.steer_right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

/// Friction and speed cap of the surface under the vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub friction: f32,
    pub max_speed: f32,
}

pub struct PhysicsEngine {
    config: KinematicsConfig,
}

impl PhysicsEngine {
    pub fn new(config: KinematicsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KinematicsConfig {
        &self.config
    }

    pub fn surface(&self, on_road: bool) -> Surface {
        if on_road {
            Surface {
                friction: self.config.friction_road,
                max_speed: self.config.max_speed,
            }
        } else {
            Surface {
                friction: self.config.friction_grass,
                max_speed: self.config.max_speed_grass,
            }
        }
    }

    /// Integrate one tick of input. Constants are per tick, not per second.
    pub fn step(&self, vehicle: &mut PlayerVehicle, input: &ControlInput, on_road: bool) {
        let surface = self.surface(on_road);
        let k = &self.config;

        if input.accelerate {
            vehicle.speed += k.accel;
        }
        if input.brake {
            vehicle.speed -= k.brake;
        }
        if input.boost {
            vehicle.speed += k.accel * k.boost_multiplier;
        }

        vehicle.speed *= surface.friction;
        if vehicle.speed.abs() > surface.max_speed {
            vehicle.speed = surface.max_speed.copysign(vehicle.speed);
        }

        // No steering at rest, so the car cannot spin in place
        if vehicle.speed.abs() > k.steer_threshold {
            vehicle.heading += k.turn_speed * vehicle.speed.signum() * input.steering();
        }

        vehicle.position += vehicle.direction() * vehicle.speed;
    }

    /// Place the player at the first point of the first road, facing the
    /// second point. A missing road or one with fewer than two points falls
    /// back to the origin, heading 0.
    pub fn spawn_player(roads: &[Road]) -> PlayerVehicle {
        let Some(first) = roads.first() else {
            log::warn!("Scenario has no roads, spawning player at origin");
            return PlayerVehicle::new(Point::origin(), 0.0);
        };

        match first.points.as_slice() {
            [a, b, ..] => {
                let heading = (b.y - a.y).atan2(b.x - a.x);
                PlayerVehicle::new(a.to_point(), heading)
            }
            _ => {
                log::warn!("First road has fewer than two points, spawning player at origin");
                PlayerVehicle::new(Point::origin(), 0.0)
            }
        }
    }
}
