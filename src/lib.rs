pub mod collab;
pub mod config;
pub mod engine;
pub mod error;
pub mod session;
pub mod simulation;

pub use config::*;
pub use engine::{Engine, FrameScheduler, FrameView, HudView};
pub use error::*;
pub use simulation::*;
