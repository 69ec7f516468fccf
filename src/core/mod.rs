//! Core simulation module
//!
//! Contains the scenario configuration and the headless simulation loop

mod events;
mod scenario;
mod simulation;
mod stats;

pub use events::{EventQueue, SimEvent};
pub use scenario::{
    BehaviorAgentConfig, ConfigError, ModeAgentConfig, PathAgentConfig, ScenarioConfig, TargetConfig,
};
pub use simulation::{AiMode, SimError, Simulation};
pub use stats::RunStats;
