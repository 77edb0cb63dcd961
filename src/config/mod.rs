use anyhow::{Context, Result};

pub mod engine;
pub mod scenario;

pub use engine::*;
pub use scenario::*;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub scenarios: ScenarioCatalog,
    pub engine: EngineConfig,
}

impl SimulationConfig {
    /// Load the scenario catalog (JSON) and, when given, the engine tuning file (TOML).
    ///
    /// A missing engine file means "use the built-in constants".
    pub fn load_from_files(scenarios_path: &str, engine_path: Option<&str>) -> Result<Self> {
        let scenarios_content = std::fs::read_to_string(scenarios_path)
            .with_context(|| format!("reading scenario catalog {scenarios_path}"))?;
        let scenarios: ScenarioCatalog = serde_json::from_str(&scenarios_content)
            .with_context(|| format!("parsing scenario catalog {scenarios_path}"))?;

        let engine = match engine_path {
            Some(path) => {
                let engine_content = std::fs::read_to_string(path)
                    .with_context(|| format!("reading engine config {path}"))?;
                toml::from_str(&engine_content)
                    .with_context(|| format!("parsing engine config {path}"))?
            }
            None => EngineConfig::default(),
        };

        // Validate configurations
        scenarios.validate()?;
        engine.validate()?;

        Ok(SimulationConfig { scenarios, engine })
    }
}

pub trait Validate {
    fn validate(&self) -> Result<()>;
}
