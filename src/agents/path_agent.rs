//! Agent driven by A* paths over the grid

use glam::Vec2;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::{Agent, PathFollower};
use crate::ai::find_path;
use crate::core::{EventQueue, PathAgentConfig, SimEvent};
use crate::world::{AgentBody, WorldView, random_cell_center};

/// What the agent is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathAgentState {
    /// Walking to random walkable cells
    Patrol,
    /// Following re-planned paths to the target
    Chase,
    /// Standing still, facing the target
    Attack,
}

impl PathAgentState {
    /// Display name
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Patrol => "Patrol",
            Self::Chase => "Chase",
            Self::Attack => "Attack",
        }
    }
}

/// Patrols, chases and attacks using grid paths.
///
/// Paths are planned on demand: a new patrol goal every `patrol_interval`
/// seconds and a fresh chase path every `replan_interval` seconds.
#[derive(Debug)]
pub struct PathAgent {
    body: AgentBody,
    config: PathAgentConfig,
    state: PathAgentState,
    follower: PathFollower,
    patrol_goal: Option<Vec2>,
    state_timer: f32,
    rng: StdRng,
}

impl PathAgent {
    /// Spawn at `position`. The first patrol goal is picked on the first update.
    #[must_use]
    pub fn new(position: Vec2, config: PathAgentConfig, seed: u64) -> Self {
        Self {
            body: AgentBody::new(position, config.radius),
            follower: PathFollower::new(config.waypoint_threshold),
            config,
            state: PathAgentState::Patrol,
            patrol_goal: None,
            state_timer: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> PathAgentState {
        self.state
    }

    /// The waypoints still ahead
    #[must_use]
    pub fn remaining_path(&self) -> &[Vec2] {
        self.follower.remaining()
    }

    /// The current patrol goal
    #[must_use]
    pub fn patrol_goal(&self) -> Option<Vec2> {
        self.patrol_goal
    }

    fn set_state(&mut self, state: PathAgentState) {
        if self.state != state {
            log::debug!("Path agent: {} -> {}", self.state.label(), state.label());
            self.state = state;
            self.state_timer = 0.0;
        }
    }

    fn plan(&mut self, goal: Vec2, world: &WorldView<'_>, events: &mut EventQueue) {
        let path = find_path(world.grid, self.body.position, goal);
        if path.is_empty() {
            events.push(SimEvent::PathNotFound {
                start: self.body.position,
                goal,
            });
        } else {
            events.push(SimEvent::PathPlanned {
                waypoints: path.len(),
                length: path.length,
            });
        }
        self.follower.set_path(path);
    }

    fn choose_patrol_goal(&mut self, world: &WorldView<'_>, events: &mut EventQueue) {
        let goal = random_cell_center(world.grid, &mut self.rng, self.config.patrol_attempts);
        self.patrol_goal = Some(goal);
        self.plan(goal, world, events);
    }
}

impl Agent for PathAgent {
    fn update(&mut self, dt: f32, world: &WorldView<'_>, events: &mut EventQueue) {
        self.state_timer += dt;
        let distance = self.body.distance_to(world.target);

        match self.state {
            PathAgentState::Patrol => {
                if self.patrol_goal.is_none() || self.state_timer > self.config.patrol_interval {
                    self.choose_patrol_goal(world, events);
                    self.state_timer = 0.0;
                }

                if distance < self.config.detection_radius {
                    self.set_state(PathAgentState::Chase);
                    self.plan(world.target, world, events);
                }

                self.follower.steer(&mut self.body, self.config.speed);
            }
            PathAgentState::Chase => {
                if distance > self.config.detection_radius {
                    self.set_state(PathAgentState::Patrol);
                    self.choose_patrol_goal(world, events);
                } else if distance < self.config.attack_radius {
                    self.set_state(PathAgentState::Attack);
                }

                if self.state == PathAgentState::Chase && self.state_timer > self.config.replan_interval {
                    self.plan(world.target, world, events);
                    self.state_timer = 0.0;
                }

                self.follower.steer(&mut self.body, self.config.speed);
            }
            PathAgentState::Attack => {
                if distance > self.config.attack_radius {
                    self.set_state(PathAgentState::Chase);
                    self.plan(world.target, world, events);
                }
                self.body.stop();
                self.body.face_towards(world.target);
            }
        }

        self.body.integrate(dt);
    }

    fn body(&self) -> &AgentBody {
        &self.body
    }

    fn state_label(&self) -> &'static str {
        self.state.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::GridMap;
    use crate::world::Obstacle;

    fn open_grid() -> GridMap {
        GridMap::new(400.0, 400.0, 20.0, &[])
    }

    #[test]
    fn test_patrol_plans_a_path() {
        let grid = open_grid();
        let world = WorldView {
            grid: &grid,
            obstacles: &[],
            target: Vec2::new(390.0, 390.0),
        };
        let mut events = EventQueue::new();
        let mut agent = PathAgent::new(Vec2::new(10.0, 10.0), PathAgentConfig::default(), 1);

        agent.update(1.0 / 60.0, &world, &mut events);
        events.swap();

        assert_eq!(agent.state(), PathAgentState::Patrol);
        assert!(agent.patrol_goal().is_some());
        assert!(events.iter().any(|e| matches!(e, SimEvent::PathPlanned { .. })));
    }

    #[test]
    fn test_detects_and_attacks_target() {
        let grid = open_grid();
        let mut events = EventQueue::new();
        let mut agent = PathAgent::new(Vec2::new(50.0, 50.0), PathAgentConfig::default(), 2);

        let world = WorldView {
            grid: &grid,
            obstacles: &[],
            target: Vec2::new(200.0, 50.0),
        };
        agent.update(0.1, &world, &mut events);
        assert_eq!(agent.state(), PathAgentState::Chase);
        assert!(!agent.remaining_path().is_empty());

        for _ in 0..200 {
            agent.update(1.0 / 60.0, &world, &mut events);
            if agent.state() == PathAgentState::Attack {
                break;
            }
        }
        assert_eq!(agent.state(), PathAgentState::Attack);

        agent.update(1.0 / 60.0, &world, &mut events);
        assert_eq!(agent.body().velocity, Vec2::ZERO);
        assert!(agent.body().rotation.abs() < 0.1);
    }

    #[test]
    fn test_chase_gives_up_when_target_leaves() {
        let grid = open_grid();
        let mut events = EventQueue::new();
        let mut agent = PathAgent::new(Vec2::new(50.0, 50.0), PathAgentConfig::default(), 3);

        let near = WorldView {
            grid: &grid,
            obstacles: &[],
            target: Vec2::new(150.0, 50.0),
        };
        agent.update(0.1, &near, &mut events);
        assert_eq!(agent.state(), PathAgentState::Chase);

        let far = WorldView {
            target: Vec2::new(390.0, 390.0),
            ..near
        };
        agent.update(0.1, &far, &mut events);
        assert_eq!(agent.state(), PathAgentState::Patrol);
    }

    #[test]
    fn test_unreachable_target_reports_no_path() {
        // Target boxed in by a solid block
        let grid = GridMap::new(400.0, 400.0, 20.0, &[Obstacle::new(100.0, 0.0, 300.0, 400.0)]);
        let mut events = EventQueue::new();
        let mut agent = PathAgent::new(Vec2::new(50.0, 50.0), PathAgentConfig::default(), 4);

        let world = WorldView {
            grid: &grid,
            obstacles: &[],
            target: Vec2::new(150.0, 50.0),
        };
        agent.update(0.1, &world, &mut events);
        events.swap();

        assert_eq!(agent.state(), PathAgentState::Chase);
        assert!(events.iter().any(|e| matches!(e, SimEvent::PathNotFound { .. })));
        assert!(agent.remaining_path().is_empty());
    }
}
