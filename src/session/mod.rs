use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use crate::error::SessionError;
use crate::simulation::{AiVehicle, CameraState, Mode, PlayerVehicle, SimulationState};

/// Everything needed to resume a run after navigating away and back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub scenario_id: String,
    pub mode: Mode,
    pub running: bool,
    pub player: Option<PlayerVehicle>,
    pub manual_camera: CameraState,
    pub ai_vehicles: Vec<AiVehicle>,
    pub ai_camera: CameraState,
}

impl SessionSnapshot {
    /// `None` until a scenario has been selected.
    pub fn capture(state: &SimulationState) -> Option<Self> {
        let scenario_id = state.scenario_id.clone()?;
        Some(Self {
            scenario_id,
            mode: state.mode,
            running: state.running,
            player: state.player,
            manual_camera: state.manual_camera,
            ai_vehicles: state.ai_vehicles.clone(),
            ai_camera: state.ai_camera,
        })
    }

    pub fn apply_to(&self, state: &mut SimulationState) {
        state.scenario_id = Some(self.scenario_id.clone());
        state.mode = self.mode;
        state.running = self.running;
        state.player = self.player;
        state.manual_camera = self.manual_camera;
        state.ai_vehicles = self.ai_vehicles.clone();
        state.ai_camera = self.ai_camera;
    }
}

/// Key-value slot holding one JSON blob. Never required for correctness.
pub trait SnapshotStore {
    fn load(&self) -> Result<Option<String>, SessionError>;
    fn save(&mut self, blob: &str) -> Result<(), SessionError>;
}

/// In-memory slot. Clones share the same slot, so a test can hand one clone
/// to an engine and read or seed it through another.
#[derive(Debug, Default, Clone)]
pub struct MemorySnapshotStore {
    slot: Rc<RefCell<Option<String>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(blob.into()))),
        }
    }

    pub fn blob(&self) -> Option<String> {
        self.slot.borrow().clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        Ok(self.slot.borrow().clone())
    }

    fn save(&mut self, blob: &str) -> Result<(), SessionError> {
        *self.slot.borrow_mut() = Some(blob.to_string());
        Ok(())
    }
}

/// Snapshot kept in a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<String>, SessionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, blob: &str) -> Result<(), SessionError> {
        std::fs::write(&self.path, blob)?;
        Ok(())
    }
}

/// Writes snapshots on a fixed simulated-time interval and restores them once.
pub struct SessionManager {
    store: Box<dyn SnapshotStore>,
    interval: Duration,
    since_last: Duration,
}

impl SessionManager {
    pub fn new(store: Box<dyn SnapshotStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            since_last: Duration::ZERO,
        }
    }

    pub fn set_store(&mut self, store: Box<dyn SnapshotStore>) {
        self.store = store;
    }

    /// Count simulated time and save when the interval has passed.
    pub fn on_tick(&mut self, state: &SimulationState, dt: Duration) {
        self.since_last += dt;
        if self.since_last >= self.interval {
            self.since_last = Duration::ZERO;
            self.save(state);
        }
    }

    pub fn reset_timer(&mut self) {
        self.since_last = Duration::ZERO;
    }

    /// Best-effort save; failures are logged and otherwise ignored.
    pub fn save(&mut self, state: &SimulationState) {
        let Some(snapshot) = SessionSnapshot::capture(state) else {
            return;
        };

        let result = serde_json::to_string(&snapshot)
            .map_err(SessionError::from)
            .and_then(|blob| self.store.save(&blob));

        match result {
            Ok(()) => log::debug!("Saved session snapshot for scenario {}", snapshot.scenario_id),
            Err(e) => log::warn!("Could not save session snapshot: {}", e),
        }
    }

    /// Load the stored snapshot if it parses and names a known scenario.
    /// Absent, unreadable, malformed and stale snapshots all yield `None`.
    pub fn restore<F>(&self, is_known_scenario: F) -> Option<SessionSnapshot>
    where
        F: Fn(&str) -> bool,
    {
        let blob = match self.store.load() {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Could not read session snapshot: {}", e);
                return None;
            }
        };

        let snapshot: SessionSnapshot = match serde_json::from_str(&blob) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::debug!("Ignoring malformed session snapshot: {}", e);
                return None;
            }
        };

        if !is_known_scenario(&snapshot.scenario_id) {
            log::debug!("Ignoring snapshot for unknown scenario {}", snapshot.scenario_id);
            return None;
        }

        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{Point, Vec2, VehicleId};

    fn sample_state() -> SimulationState {
        let mut state = SimulationState::new();
        state.scenario_id = Some("s1".into());
        state.mode = Mode::Manual;
        state.running = true;
        state.player = Some(PlayerVehicle {
            position: Point::new(12.5, -3.25),
            heading: 7.1,
            speed: -1.75,
        });
        state.manual_camera.follow(&Point::new(12.5, -3.25));
        state.ai_vehicles.push(AiVehicle {
            id: VehicleId(3),
            segment: 2,
            progress: 0.3,
            speed: 1.9,
            color: "#10b981".into(),
        });
        state.ai_camera = CameraState {
            offset: Vec2::new(-40.0, 15.0),
            zoom: 1.331,
        };
        state
    }

    #[test]
    fn interval_saves_after_enough_time() {
        let store = MemorySnapshotStore::new();
        let mut manager = SessionManager::new(Box::new(store.clone()), Duration::from_millis(1500));
        let state = sample_state();

        manager.on_tick(&state, Duration::from_millis(1000));
        assert!(store.blob().is_none());

        manager.on_tick(&state, Duration::from_millis(500));
        assert!(store.blob().is_some());
    }

    #[test]
    fn restore_requires_known_scenario() {
        let store = MemorySnapshotStore::new();
        let mut manager = SessionManager::new(Box::new(store), Duration::from_millis(1500));
        manager.save(&sample_state());

        assert!(manager.restore(|id| id == "other").is_none());
        let snapshot = manager.restore(|id| id == "s1").unwrap();
        assert_eq!(Some(snapshot), SessionSnapshot::capture(&sample_state()));
    }

    #[test]
    fn malformed_blob_is_ignored() {
        let store = MemorySnapshotStore::with_blob("{\"scenario_id\": 4, ");
        let manager = SessionManager::new(Box::new(store), Duration::from_millis(1500));
        assert!(manager.restore(|_| true).is_none());
    }

    #[test]
    fn nothing_saved_without_scenario() {
        let store = MemorySnapshotStore::new();
        let mut manager = SessionManager::new(Box::new(store.clone()), Duration::from_millis(1500));
        manager.save(&SimulationState::new());
        assert!(store.blob().is_none());
    }
}
