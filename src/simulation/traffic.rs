use super::{AiVehicle, Point, RoadNetwork, SimulationState, VehicleId};
use crate::config::AiConfig;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use rand_distr::{Normal, Distribution};

/// Spawns the AI fleet and walks it along the flattened segment list.
pub struct TrafficManager {
    config: AiConfig,
    next_vehicle_id: usize,
    rng: StdRng,
}

impl TrafficManager {
    pub fn new(config: AiConfig, seed: Option<u64>) -> Self {
        let rng = if let Some(seed) = seed {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };

        Self {
            config,
            next_vehicle_id: 0,
            rng,
        }
    }

    /// Spawn `count` vehicles, vehicle `i` on segment `i mod segment_count`.
    /// An empty network spawns nothing.
    pub fn spawn(&mut self, state: &mut SimulationState, network: &RoadNetwork, count: u32) {
        if network.is_empty() {
            log::warn!("No road segments available, skipping spawn of {} AI vehicles", count);
            return;
        }

        for i in 0..count as usize {
            let speed = self.random_speed();
            let color = self.random_color();
            let vehicle = AiVehicle {
                id: VehicleId(self.next_vehicle_id),
                segment: i % network.len(),
                progress: 0.0,
                speed,
                color,
            };

            log::debug!("Spawned AI vehicle {} on segment {} at speed {:.2}", vehicle.id.0, vehicle.segment, speed);
            state.add_ai_vehicle(vehicle);
            self.next_vehicle_id += 1;
        }

        log::info!("Spawned {} AI vehicles over {} segments", count, network.len());
    }

    pub fn update(&self, state: &mut SimulationState, network: &RoadNetwork) {
        if network.is_empty() {
            return;
        }

        for vehicle in &mut state.ai_vehicles {
            advance_vehicle(vehicle, network, self.config.tick_fraction);
        }
    }

    fn random_speed(&mut self) -> f32 {
        let base = self.config.base_speed;
        let speed = match Normal::new(base, self.config.speed_variance) {
            Ok(normal) => normal.sample(&mut self.rng),
            Err(_) => base,
        };
        speed.max(self.config.min_speed)
    }

    fn random_color(&mut self) -> String {
        if self.config.palette.is_empty() {
            return "#ffffff".to_string();
        }
        let index = self.rng.gen_range(0..self.config.palette.len());
        self.config.palette[index].clone()
    }
}

/// One tick of path following. Past the end of a segment the vehicle moves to
/// the next one, wrapping from the last segment back to the first.
pub fn advance_vehicle(vehicle: &mut AiVehicle, network: &RoadNetwork, tick_fraction: f32) {
    let count = network.len();
    if count == 0 {
        return;
    }

    // Restored snapshots may point past a shorter network
    if vehicle.segment >= count {
        vehicle.segment %= count;
        vehicle.progress = 0.0;
    }

    let segment = &network.segments()[vehicle.segment];
    if segment.is_degenerate() {
        vehicle.segment = (vehicle.segment + 1) % count;
        vehicle.progress = 0.0;
        return;
    }

    vehicle.progress += (vehicle.speed / segment.length) * tick_fraction;
    if vehicle.progress >= 1.0 {
        vehicle.segment = (vehicle.segment + 1) % count;
        vehicle.progress = 0.0;
    }
}

/// Position and heading of a vehicle on its current segment.
pub fn vehicle_pose(vehicle: &AiVehicle, network: &RoadNetwork) -> Option<(Point, f32)> {
    let segment = network.get(vehicle.segment)?;
    Some((segment.point_at(vehicle.progress), segment.heading()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Road, ScenarioPoint};

    fn line_network() -> RoadNetwork {
        RoadNetwork::compile(&[Road::new(
            vec![
                ScenarioPoint::new(0.0, 0.0),
                ScenarioPoint::new(10.0, 0.0),
                ScenarioPoint::new(10.0, 10.0),
            ],
            20.0,
        )])
    }

    #[test]
    fn spawn_round_robins_segments() {
        let network = line_network();
        let mut manager = TrafficManager::new(AiConfig::default(), Some(7));
        let mut state = SimulationState::new();

        manager.spawn(&mut state, &network, 5);

        let segments: Vec<usize> = state.ai_vehicles.iter().map(|v| v.segment).collect();
        assert_eq!(segments, vec![0, 1, 0, 1, 0]);
        assert!(state.ai_vehicles.iter().all(|v| v.progress == 0.0 && v.speed >= 0.5));
        assert_eq!(state.total_spawned, 5);
    }

    #[test]
    fn same_seed_same_fleet() {
        let network = line_network();
        let mut a = SimulationState::new();
        let mut b = SimulationState::new();

        TrafficManager::new(AiConfig::default(), Some(99)).spawn(&mut a, &network, 4);
        TrafficManager::new(AiConfig::default(), Some(99)).spawn(&mut b, &network, 4);

        assert_eq!(a.ai_vehicles, b.ai_vehicles);
    }

    #[test]
    fn advance_moves_to_next_segment_and_wraps() {
        let network = line_network();
        let mut vehicle = AiVehicle {
            id: VehicleId(0),
            segment: 1,
            progress: 0.95,
            speed: 10.0,
            color: "#fff".into(),
        };

        advance_vehicle(&mut vehicle, &network, 0.1);

        assert_eq!(vehicle.segment, 0);
        assert_eq!(vehicle.progress, 0.0);
    }

    #[test]
    fn pose_interpolates_segment() {
        let network = line_network();
        let vehicle = AiVehicle {
            id: VehicleId(0),
            segment: 1,
            progress: 0.5,
            speed: 1.0,
            color: "#fff".into(),
        };

        let (position, heading) = vehicle_pose(&vehicle, &network).unwrap();
        assert_eq!(position, Point::new(10.0, 5.0));
        assert!((heading - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
