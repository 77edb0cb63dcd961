use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use std::collections::HashSet;
use std::fmt;
use super::Validate;
use crate::simulation::Point;

/// Width given to authored roads that do not carry one.
pub const DEFAULT_ROAD_WIDTH: f32 = 40.0;

fn default_road_width() -> f32 {
    DEFAULT_ROAD_WIDTH
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ScenarioPoint {
    pub x: f32,
    pub y: f32,
}

impl ScenarioPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_point(self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Road {
    #[serde(default)]
    pub points: Vec<ScenarioPoint>,
    #[serde(default = "default_road_width")]
    pub width: f32,
}

impl Road {
    pub fn new(points: Vec<ScenarioPoint>, width: f32) -> Self {
        Self { points, width }
    }
}

/// Signal phase as carried on the wire (`"red"`, `"green"`, `"yellow"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LightPhase {
    Red,
    Green,
    Yellow,
}

impl LightPhase {
    /// Cyclic successor: red → green → yellow → red.
    pub fn next(self) -> Self {
        match self {
            LightPhase::Red => LightPhase::Green,
            LightPhase::Green => LightPhase::Yellow,
            LightPhase::Yellow => LightPhase::Red,
        }
    }
}

impl Default for LightPhase {
    fn default() -> Self {
        LightPhase::Red
    }
}

impl fmt::Display for LightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LightPhase::Red => "red",
            LightPhase::Green => "green",
            LightPhase::Yellow => "yellow",
        };
        f.write_str(name)
    }
}

/// A traffic light as authored. Coordinates may be missing in hand-edited
/// scenarios; such lights still cycle but are never checked for violations.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TrafficLightSpec {
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
    #[serde(default)]
    pub state: Option<LightPhase>,
}

impl TrafficLightSpec {
    pub fn new(x: f32, y: f32, state: LightPhase) -> Self {
        Self { x: Some(x), y: Some(y), state: Some(state) }
    }

    pub fn position(&self) -> Option<Point> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Point::new(x, y)),
            _ => None,
        }
    }
}

/// Scenario descriptor produced by the road editor. Extra authoring fields
/// (stop signs, crosswalks, hazards, weather) are ignored here.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Scenario {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roads: Vec<Road>,
    #[serde(default)]
    pub traffic_lights: Vec<TrafficLightSpec>,
}

impl Scenario {
    pub fn new(id: impl Into<String>, roads: Vec<Road>, traffic_lights: Vec<TrafficLightSpec>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            roads,
            traffic_lights,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

impl Validate for Scenario {
    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(anyhow!("Scenario id must not be empty"));
        }

        for (i, road) in self.roads.iter().enumerate() {
            if !road.width.is_finite() || road.width <= 0.0 {
                return Err(anyhow!("Road {} of scenario '{}' has non-positive width {}", i, self.id, road.width));
            }

            if road.points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
                return Err(anyhow!("Road {} of scenario '{}' has a non-finite point", i, self.id));
            }
        }

        for (i, light) in self.traffic_lights.iter().enumerate() {
            let finite = light.x.map_or(true, f32::is_finite) && light.y.map_or(true, f32::is_finite);
            if !finite {
                return Err(anyhow!("Traffic light {} of scenario '{}' has a non-finite coordinate", i, self.id));
            }
        }

        Ok(())
    }
}

/// The authored scenario list, as returned by the scenario store.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ScenarioCatalog {
    pub scenarios: Vec<Scenario>,
}

impl ScenarioCatalog {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Self { scenarios }
    }

    pub fn find(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn first(&self) -> Option<&Scenario> {
        self.scenarios.first()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

impl Validate for ScenarioCatalog {
    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            if !seen.insert(scenario.id.as_str()) {
                return Err(anyhow!("Duplicate scenario id '{}'", scenario.id));
            }
            scenario.validate()?;
        }
        Ok(())
    }
}
