//! Decision engines for agents in a 2D grid world
//!
//! This crate provides:
//! - A walkability grid built from rectangular obstacles
//! - A* pathfinding over the grid
//! - Behavior trees with resumable composites
//! - Hierarchical, event-driven state machines
//! - Agents built on each engine and a headless simulation harness

pub mod agents;
pub mod ai;
pub mod core;
pub mod world;

// Re-exports for convenience
pub use glam;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::agents::{Agent, BehaviorAgent, ModeAgent, PathAgent};
    pub use crate::ai::{
        BehaviorNode, BehaviorTree, GridMap, MachineId, PathResult, Pathfinder, Policy, State,
        StateMachine, Status, Trigger, find_path,
    };
    pub use crate::core::{AiMode, ScenarioConfig, SimEvent, Simulation};
    pub use crate::world::{AgentBody, Obstacle, WorldView};
    pub use glam::{IVec2, Vec2};
}
