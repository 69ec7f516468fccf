//! Agent driven by a hierarchical state machine
//!
//! The root machine moves the agent between Idle, Patrol and Chase. A child
//! machine tracks alertness (Calm/Alert) and only sees the events the root
//! does not handle, e.g. the target being spotted while the agent is idle.
//! Movement ignores obstacles.

use glam::Vec2;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::Agent;
use crate::ai::{FsmError, MachineId, Seek, State, StateMachine, SteeringBehavior};
use crate::core::{EventQueue, ModeAgentConfig};
use crate::world::{AgentBody, WorldView, random_point_around};

/// State identities for both machine levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeState {
    /// Root: standing still
    Idle,
    /// Root: walking between random points
    Patrol,
    /// Root: running at the target
    Chase,
    /// Alertness: nothing noticed
    Calm,
    /// Alertness: the target was noticed
    Alert,
}

impl ModeState {
    /// Display name
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Patrol => "Patrol",
            Self::Chase => "Chase",
            Self::Calm => "Calm",
            Self::Alert => "Alert",
        }
    }
}

/// Events raised by the agent from target distance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The target came inside the detection radius
    PlayerDetected,
    /// The target went beyond the lost radius
    PlayerLost,
    /// Start patrolling
    Patrol,
}

/// Shared context passed to every state
#[derive(Debug, Clone)]
pub struct ModeContext {
    /// The agent's body
    pub body: AgentBody,
    /// Target position this tick
    pub target: Vec2,
    /// World extent
    pub world_size: Vec2,
    /// Current patrol destination
    pub patrol_point: Vec2,
    /// Seconds spent in the current idle stretch
    pub idle_elapsed: f32,
    /// Set while the alertness machine is in `Alert`
    pub alerted: bool,
    /// Tuning
    pub config: ModeAgentConfig,
    rng: StdRng,
}

impl ModeContext {
    /// Distance from the body to the target
    #[must_use]
    pub fn distance_to_target(&self) -> f32 {
        self.body.distance_to(self.target)
    }

    fn pick_patrol_point(&mut self) {
        self.patrol_point = random_point_around(
            self.body.position,
            self.config.patrol_min_distance,
            self.config.patrol_max_distance,
            self.world_size,
            self.config.edge_margin,
            &mut self.rng,
        );
    }

    fn move_towards(&mut self, destination: Vec2, speed: f32) {
        let steering = Seek::new(destination, speed).calculate(self.body.position);
        self.body.velocity = steering.linear;
        if let Some(heading) = steering.heading() {
            self.body.rotation = heading;
        }
    }
}

// ============================================================================
// States
// ============================================================================

#[derive(Debug, Default)]
struct IdleState;

impl State<ModeContext> for IdleState {
    fn name(&self) -> &'static str {
        "IdleState"
    }

    fn enter(&mut self, ctx: &mut ModeContext) {
        ctx.idle_elapsed = 0.0;
        ctx.body.stop();
    }

    fn update(&mut self, ctx: &mut ModeContext, dt: f32) {
        ctx.idle_elapsed += dt;
    }
}

#[derive(Debug, Default)]
struct PatrolState;

impl State<ModeContext> for PatrolState {
    fn name(&self) -> &'static str {
        "PatrolState"
    }

    fn enter(&mut self, ctx: &mut ModeContext) {
        ctx.pick_patrol_point();
    }

    fn update(&mut self, ctx: &mut ModeContext, _dt: f32) {
        if ctx.body.distance_to(ctx.patrol_point) < ctx.config.patrol_arrival {
            ctx.pick_patrol_point();
        }
        let (point, speed) = (ctx.patrol_point, ctx.config.patrol_speed);
        ctx.move_towards(point, speed);
    }
}

#[derive(Debug, Default)]
struct ChaseState;

impl State<ModeContext> for ChaseState {
    fn name(&self) -> &'static str {
        "ChaseState"
    }

    fn update(&mut self, ctx: &mut ModeContext, _dt: f32) {
        let (target, speed) = (ctx.target, ctx.config.chase_speed);
        ctx.move_towards(target, speed);
    }

    fn exit(&mut self, ctx: &mut ModeContext) {
        ctx.body.stop();
    }
}

#[derive(Debug, Default)]
struct CalmState;

impl State<ModeContext> for CalmState {
    fn name(&self) -> &'static str {
        "CalmState"
    }

    fn enter(&mut self, ctx: &mut ModeContext) {
        ctx.alerted = false;
    }

    fn update(&mut self, _ctx: &mut ModeContext, _dt: f32) {}
}

#[derive(Debug, Default)]
struct AlertState;

impl State<ModeContext> for AlertState {
    fn name(&self) -> &'static str {
        "AlertState"
    }

    fn enter(&mut self, ctx: &mut ModeContext) {
        ctx.alerted = true;
    }

    fn update(&mut self, _ctx: &mut ModeContext, _dt: f32) {}
}

// ============================================================================
// Agent
// ============================================================================

/// Idles, patrols and chases according to a hierarchical state machine.
#[derive(Debug)]
pub struct ModeAgent {
    ctx: ModeContext,
    machine: StateMachine<ModeState, Signal, ModeContext>,
    alertness: MachineId,
}

impl ModeAgent {
    /// Spawn at `position` and start patrolling.
    ///
    /// # Errors
    ///
    /// Returns an [`FsmError`] if the machine wiring is inconsistent.
    pub fn new(
        position: Vec2,
        world_size: Vec2,
        config: ModeAgentConfig,
        seed: u64,
    ) -> Result<Self, FsmError> {
        let auto_chase_radius = config.auto_chase_radius;
        let lost_radius = config.lost_radius;
        let idle_time = config.idle_time;

        let mut ctx = ModeContext {
            body: AgentBody::new(position, config.radius),
            target: position,
            world_size,
            patrol_point: position,
            idle_elapsed: 0.0,
            alerted: false,
            config,
            rng: StdRng::seed_from_u64(seed),
        };

        let mut machine: StateMachine<ModeState, Signal, ModeContext> = StateMachine::new();
        machine.add_state(ModeState::Idle, IdleState);
        machine.add_state(ModeState::Patrol, PatrolState);
        machine.add_state(ModeState::Chase, ChaseState);

        machine.add_transition(ModeState::Idle, Signal::Patrol, ModeState::Patrol, |_| true);
        machine.add_transition(ModeState::Patrol, Signal::PlayerDetected, ModeState::Chase, |_| true);
        machine.add_transition(ModeState::Chase, Signal::PlayerLost, ModeState::Idle, |_| true);
        machine.add_auto_transition(ModeState::Patrol, ModeState::Chase, move |ctx: &ModeContext| {
            ctx.distance_to_target() < auto_chase_radius
        });
        machine.add_auto_transition(ModeState::Idle, ModeState::Patrol, move |ctx: &ModeContext| {
            ctx.idle_elapsed >= idle_time || ctx.alerted
        });

        let alertness = machine.add_child(MachineId::ROOT)?;
        let child = machine.machine_mut(alertness)?;
        child.add_state(ModeState::Calm, CalmState);
        child.add_state(ModeState::Alert, AlertState);
        child.add_transition(ModeState::Calm, Signal::PlayerDetected, ModeState::Alert, |_| true);
        child.add_transition(ModeState::Alert, Signal::PlayerLost, ModeState::Calm, |_| true);
        child.add_auto_transition(ModeState::Alert, ModeState::Calm, move |ctx: &ModeContext| {
            ctx.distance_to_target() > lost_radius
        });
        child.set_state(ModeState::Calm, &mut ctx)?;

        machine.validate()?;
        machine.set_state(ModeState::Idle, &mut ctx)?;
        machine.trigger_event(Signal::Patrol, &mut ctx);

        Ok(Self {
            ctx,
            machine,
            alertness,
        })
    }

    /// Active root state
    #[must_use]
    pub fn state(&self) -> Option<ModeState> {
        self.machine.current_state()
    }

    /// Active alertness state
    #[must_use]
    pub fn alertness(&self) -> Option<ModeState> {
        self.machine
            .machine(self.alertness)
            .and_then(|m| m.current_state())
    }

    /// Shared state context
    #[must_use]
    pub fn context(&self) -> &ModeContext {
        &self.ctx
    }

    /// The underlying state machine
    #[must_use]
    pub fn machine(&self) -> &StateMachine<ModeState, Signal, ModeContext> {
        &self.machine
    }

    fn raise_signals(&mut self) {
        let distance = self.ctx.distance_to_target();
        let chasing = self.machine.is_in_state(ModeState::Chase);

        if distance < self.ctx.config.detection_radius && !chasing {
            self.machine.trigger_event(Signal::PlayerDetected, &mut self.ctx);
        } else if distance > self.ctx.config.lost_radius && chasing {
            self.machine.trigger_event(Signal::PlayerLost, &mut self.ctx);
        }
    }
}

impl Agent for ModeAgent {
    fn update(&mut self, dt: f32, world: &WorldView<'_>, _events: &mut EventQueue) {
        self.ctx.target = world.target;
        self.ctx.world_size = world.size();

        self.machine.update(&mut self.ctx, dt);
        self.ctx.body.integrate(dt);
        self.raise_signals();
    }

    fn body(&self) -> &AgentBody {
        &self.ctx.body
    }

    fn state_label(&self) -> &'static str {
        self.state().map_or("None", ModeState::label)
    }
}
