//! Headless simulation harness
//!
//! Owns the world (obstacles, grid, target) and the agents of the active
//! [`AiMode`], and advances them in fixed ticks.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use super::events::{EventQueue, SimEvent};
use super::scenario::{ConfigError, ScenarioConfig};
use super::stats::RunStats;
use crate::agents::{Agent, BehaviorAgent, ModeAgent, PathAgent};
use crate::ai::{FsmError, GridMap};
use crate::world::{Obstacle, Target, WorldView};

/// Random spawns keep this far from obstacles
const SPAWN_CLEARANCE: f32 = 20.0;
/// Random spawns keep this far from the world edge
const SPAWN_MARGIN: f32 = 50.0;
/// Attempts at finding a clear random spawn
const SPAWN_ATTEMPTS: usize = 20;

/// Which decision engine drives the agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiMode {
    /// A* path planning
    AStar,
    /// Behavior tree
    BehaviorTree,
    /// Hierarchical state machine
    Fsm,
}

impl AiMode {
    /// Every mode, in menu order
    pub const ALL: [Self; 3] = [Self::AStar, Self::BehaviorTree, Self::Fsm];

    /// Display name
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::AStar => "A*",
            Self::BehaviorTree => "Behavior Tree",
            Self::Fsm => "FSM",
        }
    }
}

impl fmt::Display for AiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AiMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "astar" | "a*" | "path" => Ok(Self::AStar),
            "2" | "bt" | "behavior-tree" | "behaviortree" | "tree" => Ok(Self::BehaviorTree),
            "3" | "fsm" | "state-machine" | "statemachine" => Ok(Self::Fsm),
            other => Err(ConfigError::Invalid(format!(
                "unknown mode '{other}' (expected astar, bt or fsm)"
            ))),
        }
    }
}

/// Errors that can occur while setting up a simulation
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// The scenario is unusable
    Config(ConfigError),
    /// A state-machine agent could not be wired
    Fsm(FsmError),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            Self::Fsm(e) => write!(f, "State machine error: {e}"),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Fsm(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<FsmError> for SimError {
    fn from(e: FsmError) -> Self {
        Self::Fsm(e)
    }
}

/// A running scenario
#[derive(Debug)]
pub struct Simulation {
    config: ScenarioConfig,
    grid: GridMap,
    target: Target,
    agents: Vec<Box<dyn Agent>>,
    mode: AiMode,
    rng: StdRng,
    events: EventQueue,
    stats: RunStats,
    elapsed: f32,
}

impl Simulation {
    /// Build the world and spawn the agents for `mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario fails validation or an agent cannot
    /// be constructed.
    pub fn new(config: ScenarioConfig, mode: AiMode) -> Result<Self, SimError> {
        config.validate()?;

        let grid = GridMap::new(
            config.world_width,
            config.world_height,
            config.cell_size,
            &config.obstacles,
        );
        let target = Target::new(
            config.target_start(),
            config.target.route.clone(),
            config.target.speed,
        );

        let mut sim = Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            grid,
            target,
            agents: Vec::new(),
            mode,
            events: EventQueue::new(),
            stats: RunStats::new(),
            elapsed: 0.0,
        };
        sim.push_grid_event();
        sim.agents = sim.spawn_agents(mode)?;

        log::info!(
            "Scenario '{}': {}x{} grid, {} agent(s), {} mode",
            sim.config.name,
            sim.grid.width(),
            sim.grid.height(),
            sim.agents.len(),
            sim.mode
        );
        Ok(sim)
    }

    /// Switch every agent to another decision engine.
    ///
    /// Rebuilds the grid and respawns the agents from scratch. Switching to
    /// the active mode does nothing and returns `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the new agents cannot be constructed.
    pub fn switch_mode(&mut self, mode: AiMode) -> Result<bool, SimError> {
        if mode == self.mode {
            return Ok(false);
        }

        let agents = self.spawn_agents(mode)?;

        log::info!("Switching AI mode: {} -> {}", self.mode, mode);
        self.events.push(SimEvent::ModeSwitched {
            from: self.mode,
            to: mode,
        });
        self.mode = mode;
        self.agents = agents;
        self.rebuild_grid();
        Ok(true)
    }

    /// Respawn the agents of the current mode
    ///
    /// # Errors
    ///
    /// Returns an error if the agents cannot be constructed.
    pub fn reset_agents(&mut self) -> Result<(), SimError> {
        log::info!("Resetting {} agent(s)", self.agents.len());
        self.agents = self.spawn_agents(self.mode)?;
        Ok(())
    }

    /// Replace the obstacles and rebuild the grid; agents keep their state
    pub fn set_obstacles(&mut self, obstacles: Vec<Obstacle>) {
        self.config.obstacles = obstacles;
        self.rebuild_grid();
    }

    /// Teleport the target
    pub fn set_target_position(&mut self, position: Vec2) {
        self.target.set_position(position);
    }

    /// Advance the world by one tick of `dt` seconds
    pub fn step(&mut self, dt: f32) {
        let started = Instant::now();

        self.target.advance(dt);
        let view = WorldView {
            grid: &self.grid,
            obstacles: &self.config.obstacles,
            target: self.target.position(),
        };

        for agent in &mut self.agents {
            let before = agent.state_label();
            agent.update(dt, &view, &mut self.events);
            let after = agent.state_label();

            if before != after {
                self.events.push(SimEvent::AgentStateChanged {
                    from: before,
                    to: after,
                });
            }
            self.stats
                .record_agent(after, dt, agent.body().distance_to(view.target));
        }

        self.elapsed += dt;
        self.events.swap();
        for event in self.events.iter() {
            self.stats.record_event(event);
        }
        self.stats.record_tick(started.elapsed());
    }

    /// Run `ticks` ticks of the scenario's tick length
    pub fn run(&mut self, ticks: u32) {
        let dt = self.config.tick_seconds;
        for _ in 0..ticks {
            self.step(dt);
        }
    }

    /// Active mode
    #[must_use]
    pub fn mode(&self) -> AiMode {
        self.mode
    }

    /// The walkability grid
    #[must_use]
    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    /// The scenario being run
    #[must_use]
    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// The live agents
    #[must_use]
    pub fn agents(&self) -> &[Box<dyn Agent>] {
        &self.agents
    }

    /// Target position
    #[must_use]
    pub fn target_position(&self) -> Vec2 {
        self.target.position()
    }

    /// Simulated seconds since start
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Events published by the last tick
    #[must_use]
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Accumulated statistics
    #[must_use]
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    fn rebuild_grid(&mut self) {
        self.grid.rebuild(
            self.config.world_width,
            self.config.world_height,
            self.config.cell_size,
            &self.config.obstacles,
        );
        self.push_grid_event();
    }

    fn push_grid_event(&mut self) {
        self.events.push(SimEvent::GridRebuilt {
            width: self.grid.width(),
            height: self.grid.height(),
            blocked: self.grid.blocked_count(),
        });
    }

    /// Build a fresh set of agents for `mode` without installing them
    fn spawn_agents(&mut self, mode: AiMode) -> Result<Vec<Box<dyn Agent>>, SimError> {
        let spawns = if self.config.agent_spawns.is_empty() {
            (0..self.config.agent_count)
                .map(|_| self.random_spawn())
                .collect::<Vec<_>>()
        } else {
            self.config.agent_spawns.clone()
        };

        let mut agents = Vec::with_capacity(spawns.len());
        for position in spawns {
            agents.push(self.create_agent(mode, position)?);
        }
        Ok(agents)
    }

    fn create_agent(&mut self, mode: AiMode, position: Vec2) -> Result<Box<dyn Agent>, SimError> {
        let seed = self.rng.next_u64();
        log::debug!("Spawning {mode} agent at {position}");

        Ok(match mode {
            AiMode::AStar => Box::new(PathAgent::new(position, self.config.path_agent.clone(), seed)),
            AiMode::BehaviorTree => Box::new(BehaviorAgent::new(
                position,
                self.config.behavior_agent.clone(),
                seed,
            )),
            AiMode::Fsm => Box::new(ModeAgent::new(
                position,
                self.config.world_size(),
                self.config.mode_agent.clone(),
                seed,
            )?),
        })
    }

    /// A point inside the margin, clear of obstacles when one can be found
    fn random_spawn(&mut self) -> Vec2 {
        let size = self.config.world_size();
        let axis = |rng: &mut StdRng, extent: f32| {
            if extent > 2.0 * SPAWN_MARGIN {
                rng.gen_range(SPAWN_MARGIN..extent - SPAWN_MARGIN)
            } else {
                extent * 0.5
            }
        };

        let mut position = size * 0.5;
        for _ in 0..SPAWN_ATTEMPTS {
            position = Vec2::new(axis(&mut self.rng, size.x), axis(&mut self.rng, size.y));
            let blocked = self
                .config
                .obstacles
                .iter()
                .any(|o| o.intersects_circle(position, SPAWN_CLEARANCE));
            if !blocked {
                break;
            }
        }
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_scenario() -> ScenarioConfig {
        ScenarioConfig::empty(600.0, 400.0, 20.0)
            .with_agent_spawn(Vec2::new(100.0, 200.0))
            .with_target(Vec2::new(250.0, 200.0), Vec::new())
    }

    #[test]
    fn test_default_simulation() {
        let sim = Simulation::new(ScenarioConfig::default(), AiMode::AStar).unwrap();

        assert_eq!(sim.grid().width(), 64);
        assert_eq!(sim.grid().height(), 36);
        assert_eq!(sim.agents().len(), 2);
        assert_eq!(sim.target_position(), Vec2::new(640.0, 360.0));
        for agent in sim.agents() {
            let p = agent.body().position;
            assert!(p.x >= 50.0 && p.x <= 1230.0);
            assert!(p.y >= 50.0 && p.y <= 670.0);
        }
    }

    #[test]
    fn test_invalid_scenario_is_rejected() {
        let result = Simulation::new(ScenarioConfig::default().with_cell_size(-1.0), AiMode::Fsm);

        assert!(matches!(result, Err(SimError::Config(ConfigError::Invalid(_)))));
    }

    #[test]
    fn test_oversized_world_is_rejected() {
        let result = Simulation::new(ScenarioConfig::empty(1e30, 1e30, 1.0), AiMode::AStar);

        assert!(matches!(result, Err(SimError::Config(ConfigError::Invalid(_)))));
    }

    #[test]
    fn test_switch_mode_respawns() {
        let mut sim = Simulation::new(open_scenario(), AiMode::AStar).unwrap();
        sim.run(30);
        assert_ne!(sim.agents()[0].body().position, Vec2::new(100.0, 200.0));

        assert!(!sim.switch_mode(AiMode::AStar).unwrap());
        assert!(sim.switch_mode(AiMode::Fsm).unwrap());
        assert_eq!(sim.mode(), AiMode::Fsm);
        assert_eq!(sim.agents()[0].body().position, Vec2::new(100.0, 200.0));

        sim.step(0.01);
        assert!(sim.events().iter().any(|e| matches!(
            e,
            SimEvent::ModeSwitched {
                from: AiMode::AStar,
                to: AiMode::Fsm
            }
        )));
        assert!(sim.events().iter().any(|e| matches!(e, SimEvent::GridRebuilt { .. })));
    }

    #[test]
    fn test_switch_mode_installs_matching_agents() {
        let config = open_scenario().with_agent_spawn(Vec2::new(400.0, 300.0));
        let mut sim = Simulation::new(config, AiMode::Fsm).unwrap();

        assert!(sim.switch_mode(AiMode::AStar).unwrap());
        assert_eq!(sim.mode(), AiMode::AStar);
        assert_eq!(sim.agents().len(), 2);
        for agent in sim.agents() {
            assert!(["Patrol", "Chase", "Attack"].contains(&agent.state_label()));
        }

        assert!(sim.switch_mode(AiMode::BehaviorTree).unwrap());
        sim.step(0.01);
        let switches: Vec<_> = sim
            .events()
            .iter()
            .filter_map(|e| match e {
                SimEvent::ModeSwitched { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect();
        assert_eq!(
            switches,
            vec![(AiMode::Fsm, AiMode::AStar), (AiMode::AStar, AiMode::BehaviorTree)]
        );
    }

    #[test]
    fn test_astar_agent_reaches_attack() {
        let mut sim = Simulation::new(open_scenario(), AiMode::AStar).unwrap();
        sim.run(180);

        assert!(sim.stats().time_in("Attack") > 0.0);
        assert!(sim.stats().paths_planned() > 0);
        assert!(sim.stats().closest_approach().unwrap() < 50.0);
    }

    #[test]
    fn test_behavior_tree_agent_attacks() {
        let mut sim = Simulation::new(open_scenario(), AiMode::BehaviorTree).unwrap();
        sim.run(120);

        assert_eq!(sim.agents()[0].state_label(), "Attack");
        assert!(sim.stats().state_changes() >= 2);
    }

    #[test]
    fn test_fsm_agent_chases() {
        let mut sim = Simulation::new(open_scenario(), AiMode::Fsm).unwrap();
        // Inside detection range, outside the automatic chase radius
        sim.set_target_position(Vec2::new(220.0, 200.0));
        sim.step(1.0 / 60.0);

        assert_eq!(sim.agents()[0].state_label(), "Chase");
    }

    #[test]
    fn test_runs_are_deterministic() {
        let run = || {
            let mut sim = Simulation::new(ScenarioConfig::default().with_seed(99), AiMode::BehaviorTree).unwrap();
            sim.run(300);
            sim.agents()
                .iter()
                .map(|a| a.body().position)
                .collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_reset_agents_returns_to_spawn() {
        let mut sim = Simulation::new(open_scenario(), AiMode::BehaviorTree).unwrap();
        sim.run(30);
        assert_ne!(sim.agents()[0].body().position, Vec2::new(100.0, 200.0));

        sim.reset_agents().unwrap();
        assert_eq!(sim.agents().len(), 1);
        assert_eq!(sim.agents()[0].body().position, Vec2::new(100.0, 200.0));
    }

    #[test]
    fn test_set_obstacles_rebuilds_grid() {
        let mut sim = Simulation::new(open_scenario(), AiMode::AStar).unwrap();
        assert_eq!(sim.grid().blocked_count(), 0);

        sim.set_obstacles(vec![Obstacle::new(300.0, 0.0, 19.0, 400.0)]);
        assert_eq!(sim.grid().blocked_count(), 20);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("astar".parse::<AiMode>().unwrap(), AiMode::AStar);
        assert_eq!("BT".parse::<AiMode>().unwrap(), AiMode::BehaviorTree);
        assert_eq!("3".parse::<AiMode>().unwrap(), AiMode::Fsm);
        assert!("dijkstra".parse::<AiMode>().is_err());
        assert_eq!(AiMode::BehaviorTree.to_string(), "Behavior Tree");
    }
}
