//! Agent driven by a behavior tree
//!
//! The tree is a priority selector:
//!
//! ```text
//! Root (selector)
//! ├── FleeSequence:    IsLowHealth → Flee
//! ├── AttackSequence:  IsTargetInAttackRange → Attack
//! ├── PursueSequence:  IsTargetDetected → Pursue
//! └── WanderSequence:  Wander
//! ```
//!
//! Pursue and Attack move in a straight line through obstacles; every other
//! behavior collides with them.

use glam::Vec2;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::Agent;
use crate::ai::{BehaviorNode, BehaviorTree, Flee, Seek, SteeringBehavior, Status};
use crate::core::{BehaviorAgentConfig, EventQueue};
use crate::world::{AgentBody, WorldView, random_point_around};

/// The behavior the tree selected most recently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Behavior {
    /// Resting after a successful escape
    Idle,
    /// Walking between random nearby points
    Wander,
    /// Running straight at the target
    Pursue,
    /// Standing still, facing the target
    Attack,
    /// Running away from the target
    Flee,
}

impl Behavior {
    /// Display name
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Wander => "Wander",
            Self::Pursue => "Pursue",
            Self::Attack => "Attack",
            Self::Flee => "Flee",
        }
    }
}

/// Tree context: everything conditions and actions read or write.
#[derive(Debug, Clone)]
pub struct Blackboard {
    /// The agent's body
    pub body: AgentBody,
    /// Target position this tick
    pub target: Vec2,
    /// Health in `0.0..=1.0`
    pub health: f32,
    /// Current behavior
    pub behavior: Behavior,
    /// Seconds since the behavior last (re)started its timer
    pub state_timer: f32,
    /// Move without colliding this tick
    pub ignore_obstacles: bool,
    /// Current wander destination
    pub wander_target: Option<Vec2>,
    /// A new wander destination should be chosen after the tree runs
    pub wander_requested: bool,
    /// Tuning
    pub config: BehaviorAgentConfig,
}

impl Blackboard {
    fn distance_to_target(&self) -> f32 {
        self.body.distance_to(self.target)
    }

    fn enter(&mut self, behavior: Behavior, ignore_obstacles: bool) -> bool {
        if self.behavior == behavior {
            return false;
        }
        log::debug!("Behavior agent: {} -> {}", self.behavior.label(), behavior.label());
        self.behavior = behavior;
        self.state_timer = 0.0;
        self.ignore_obstacles = ignore_obstacles;
        true
    }
}

// ============================================================================
// Conditions
// ============================================================================

fn is_low_health(board: &Blackboard) -> bool {
    board.health <= board.config.low_health
}

fn is_target_in_attack_range(board: &Blackboard) -> bool {
    board.distance_to_target() <= board.config.attack_radius
}

fn is_target_detected(board: &Blackboard) -> bool {
    board.distance_to_target() <= board.config.detection_radius
}

// ============================================================================
// Actions
// ============================================================================

fn flee(board: &mut Blackboard) -> Status {
    board.enter(Behavior::Flee, false);

    if board.distance_to_target() > board.config.detection_radius * 1.5 {
        board.behavior = Behavior::Idle;
        board.body.stop();
        return Status::Success;
    }

    let speed = board.config.speed * board.config.flee_speed_factor;
    let steering = Flee::new(board.target, speed).calculate(board.body.position);
    if let Some(heading) = steering.heading() {
        board.body.velocity = steering.linear;
        board.body.rotation = heading;
    }
    Status::Running
}

fn attack(board: &mut Blackboard) -> Status {
    board.enter(Behavior::Attack, true);
    board.body.stop();
    let target = board.target;
    board.body.face_towards(target);
    Status::Success
}

fn pursue(board: &mut Blackboard) -> Status {
    board.enter(Behavior::Pursue, true);
    let steering = Seek::new(board.target, board.config.speed).calculate(board.body.position);
    board.body.velocity = steering.linear;
    if let Some(heading) = steering.heading() {
        board.body.rotation = heading;
    }
    Status::Success
}

fn wander(board: &mut Blackboard) -> Status {
    if board.enter(Behavior::Wander, false) || board.wander_target.is_none() {
        board.wander_requested = true;
        board.state_timer = 0.0;
        return Status::Success;
    }

    if board.state_timer > board.config.wander_interval {
        board.wander_requested = true;
        board.state_timer = 0.0;
        return Status::Success;
    }

    if let Some(destination) = board.wander_target {
        if board.body.distance_to(destination) < board.config.wander_arrival {
            board.wander_requested = true;
        } else {
            steer_towards(&mut board.body, destination, board.config.wander_speed);
        }
    }
    Status::Success
}

fn steer_towards(body: &mut AgentBody, destination: Vec2, speed: f32) {
    let steering = Seek::new(destination, speed).calculate(body.position);
    body.velocity = steering.linear;
    if let Some(heading) = steering.heading() {
        body.rotation = heading;
    }
}

fn build_tree() -> BehaviorTree<Blackboard> {
    BehaviorTree::new(BehaviorNode::selector(
        "RootSelector",
        vec![
            BehaviorNode::sequence(
                "FleeSequence",
                vec![
                    BehaviorNode::condition("IsLowHealth", is_low_health),
                    BehaviorNode::action("Flee", flee),
                ],
            ),
            BehaviorNode::sequence(
                "AttackSequence",
                vec![
                    BehaviorNode::condition("IsTargetInAttackRange", is_target_in_attack_range),
                    BehaviorNode::action("Attack", attack),
                ],
            ),
            BehaviorNode::sequence(
                "PursueSequence",
                vec![
                    BehaviorNode::condition("IsTargetDetected", is_target_detected),
                    BehaviorNode::action("Pursue", pursue),
                ],
            ),
            BehaviorNode::sequence("WanderSequence", vec![BehaviorNode::action("Wander", wander)]),
        ],
    ))
}

// ============================================================================
// Agent
// ============================================================================

/// Wanders, pursues, attacks and flees according to a behavior tree.
#[derive(Debug)]
pub struct BehaviorAgent {
    board: Blackboard,
    tree: BehaviorTree<Blackboard>,
    rng: StdRng,
}

impl BehaviorAgent {
    /// Spawn at `position` in the idle behavior
    #[must_use]
    pub fn new(position: Vec2, config: BehaviorAgentConfig, seed: u64) -> Self {
        let board = Blackboard {
            body: AgentBody::new(position, config.radius),
            target: Vec2::ZERO,
            health: config.initial_health.clamp(0.0, 1.0),
            behavior: Behavior::Idle,
            state_timer: 0.0,
            ignore_obstacles: false,
            wander_target: None,
            wander_requested: false,
            config,
        };
        Self {
            board,
            tree: build_tree(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Current behavior
    #[must_use]
    pub fn behavior(&self) -> Behavior {
        self.board.behavior
    }

    /// Current health
    #[must_use]
    pub fn health(&self) -> f32 {
        self.board.health
    }

    /// Lose `amount` health
    pub fn damage(&mut self, amount: f32) {
        self.board.health = (self.board.health - amount).clamp(0.0, 1.0);
    }

    /// Read-only view of the tree context
    #[must_use]
    pub fn blackboard(&self) -> &Blackboard {
        &self.board
    }

    /// The behavior tree
    #[must_use]
    pub fn tree(&self) -> &BehaviorTree<Blackboard> {
        &self.tree
    }

    fn choose_wander_target(&mut self, world: &WorldView<'_>) -> Vec2 {
        let config = &self.board.config;
        let origin = self.board.body.position;
        let mut candidate = origin;

        for _ in 0..config.wander_attempts.max(1) {
            candidate = random_point_around(
                origin,
                config.wander_min_distance,
                config.wander_max_distance,
                world.size(),
                config.edge_margin,
                &mut self.rng,
            );
            if world.grid.is_walkable(candidate) {
                break;
            }
        }
        candidate
    }
}

impl Agent for BehaviorAgent {
    fn update(&mut self, dt: f32, world: &WorldView<'_>, _events: &mut EventQueue) {
        self.board.state_timer += dt;
        self.board.target = world.target;

        self.tree.execute(&mut self.board);

        if std::mem::take(&mut self.board.wander_requested) {
            let destination = self.choose_wander_target(world);
            self.board.wander_target = Some(destination);
            if self.board.body.distance_to(destination) >= self.board.config.wander_arrival {
                let speed = self.board.config.wander_speed;
                steer_towards(&mut self.board.body, destination, speed);
            }
        }

        if self.board.ignore_obstacles {
            self.board.body.integrate(dt);
        } else {
            self.board.body.integrate_with_obstacles(dt, world.obstacles);
        }

        if self.board.health < 1.0 {
            self.board.health = (self.board.health + self.board.config.health_regen * dt).clamp(0.0, 1.0);
        }
    }

    fn body(&self) -> &AgentBody {
        &self.board.body
    }

    fn state_label(&self) -> &'static str {
        self.board.behavior.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::GridMap;

    const DT: f32 = 1.0 / 60.0;

    fn world(grid: &GridMap, target: Vec2) -> WorldView<'_> {
        WorldView {
            grid,
            obstacles: &[],
            target,
        }
    }

    #[test]
    fn test_wanders_when_target_far() {
        let grid = GridMap::new(1000.0, 1000.0, 20.0, &[]);
        let mut events = EventQueue::new();
        let mut agent = BehaviorAgent::new(Vec2::new(500.0, 500.0), BehaviorAgentConfig::default(), 1);

        agent.update(DT, &world(&grid, Vec2::new(950.0, 950.0)), &mut events);

        assert_eq!(agent.behavior(), Behavior::Wander);
        let destination = agent.blackboard().wander_target.unwrap();
        let distance = destination.distance(Vec2::new(500.0, 500.0));
        assert!((50.0..=250.0).contains(&distance));
        assert!(agent.body().velocity.length() > 79.0);
    }

    #[test]
    fn test_pursue_then_attack() {
        let grid = GridMap::new(1000.0, 1000.0, 20.0, &[]);
        let mut events = EventQueue::new();
        let mut agent = BehaviorAgent::new(Vec2::new(100.0, 100.0), BehaviorAgentConfig::default(), 2);
        let view = world(&grid, Vec2::new(250.0, 100.0));

        agent.update(DT, &view, &mut events);
        assert_eq!(agent.behavior(), Behavior::Pursue);
        assert!(agent.blackboard().ignore_obstacles);
        assert!((agent.body().velocity.x - 150.0).abs() < 1e-3);

        for _ in 0..120 {
            agent.update(DT, &view, &mut events);
        }
        assert_eq!(agent.behavior(), Behavior::Attack);
        assert_eq!(agent.body().velocity, Vec2::ZERO);
        assert!(agent.body().distance_to(view.target) <= 50.0);
    }

    #[test]
    fn test_low_health_flees_until_safe() {
        let grid = GridMap::new(2000.0, 400.0, 20.0, &[]);
        let mut events = EventQueue::new();
        let mut agent = BehaviorAgent::new(Vec2::new(300.0, 200.0), BehaviorAgentConfig::default(), 3);
        agent.damage(0.8);
        let view = world(&grid, Vec2::new(250.0, 200.0));

        agent.update(DT, &view, &mut events);
        assert_eq!(agent.behavior(), Behavior::Flee);
        assert!((agent.body().velocity.x - 180.0).abs() < 1e-3);

        // 270 units of separation at 180 units per second
        for _ in 0..120 {
            agent.update(DT, &view, &mut events);
            if agent.behavior() != Behavior::Flee {
                break;
            }
        }
        assert!(agent.body().distance_to(view.target) > 270.0);
        assert_ne!(agent.behavior(), Behavior::Flee);
    }

    #[test]
    fn test_health_regenerates() {
        let grid = GridMap::new(1000.0, 1000.0, 20.0, &[]);
        let mut events = EventQueue::new();
        let mut agent = BehaviorAgent::new(Vec2::new(500.0, 500.0), BehaviorAgentConfig::default(), 4);
        agent.damage(0.5);

        agent.update(1.0, &world(&grid, Vec2::new(950.0, 950.0)), &mut events);
        assert!((agent.health() - 0.52).abs() < 1e-4);

        agent.damage(-2.0);
        assert_eq!(agent.health(), 1.0);
    }

    #[test]
    fn test_tree_ticks_once_per_update() {
        let grid = GridMap::new(1000.0, 1000.0, 20.0, &[]);
        let mut events = EventQueue::new();
        let mut agent = BehaviorAgent::new(Vec2::new(500.0, 500.0), BehaviorAgentConfig::default(), 5);

        for _ in 0..3 {
            agent.update(DT, &world(&grid, Vec2::ZERO), &mut events);
        }
        assert_eq!(agent.tree().ticks(), 3);
        assert_eq!(agent.tree().last_status(), Some(Status::Success));
    }
}
