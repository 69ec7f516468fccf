//! Grid-world agents
//!
//! Each agent wraps one decision engine: [`PathAgent`] plans A* paths,
//! [`BehaviorAgent`] runs a behavior tree and [`ModeAgent`] runs a
//! hierarchical state machine.

mod behavior_agent;
mod follower;
mod mode_agent;
mod path_agent;

pub use behavior_agent::{Behavior, BehaviorAgent, Blackboard};
pub use follower::PathFollower;
pub use mode_agent::{ModeAgent, ModeContext, ModeState, Signal};
pub use path_agent::{PathAgent, PathAgentState};

use std::fmt;

use crate::core::EventQueue;
use crate::world::{AgentBody, WorldView};

/// A single decision-making agent
pub trait Agent: fmt::Debug {
    /// Decide and move for one tick of `dt` seconds
    fn update(&mut self, dt: f32, world: &WorldView<'_>, events: &mut EventQueue);

    /// The agent's body
    fn body(&self) -> &AgentBody;

    /// Name of what the agent is doing right now
    fn state_label(&self) -> &'static str;
}
