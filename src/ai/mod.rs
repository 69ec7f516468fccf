//! AI and navigation module
//!
//! Provides the walkability grid, A* pathfinding, behavior trees,
//! hierarchical state machines and kinematic steering.

mod behavior;
mod fsm;
mod grid;
mod pathfinding;
mod steering;

pub use behavior::{ActionFn, BehaviorNode, BehaviorTree, Policy, Predicate, Status, TreeError};
pub use fsm::{Condition, FsmError, Machine, MachineId, State, StateMachine, Trigger};
pub use grid::{GridMap, MAX_CELLS, Neighbors};
pub use pathfinding::{PathResult, Pathfinder, find_path};
pub use steering::{Flee, Seek, SteeringBehavior, SteeringOutput};
