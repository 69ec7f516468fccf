//! Hierarchical, event-driven finite state machines
//!
//! States implement [`State`] and are registered under a caller-chosen
//! identity (usually a small `Copy` enum). Transitions are rows of
//! `(from, trigger, to, condition)` kept in registration order; the first row
//! whose source matches the active state, whose condition holds and whose
//! target is registered wins. Rows pointing at unregistered states are
//! skipped.
//!
//! Machines nest: a [`StateMachine`] is an arena of [`Machine`] levels, each
//! holding a parent index and its children's indices. Events that no
//! transition of a machine accepts fan out to every child, and `update`
//! always runs parent first, then children, then the automatic transitions.
//!
//! # Example
//!
//! ```ignore
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Mode { Idle, Patrol, Chase }
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Signal { PlayerDetected, PlayerLost }
//!
//! let mut fsm: StateMachine<Mode, Signal, Blackboard> = StateMachine::new();
//! fsm.add_state(Mode::Idle, IdleState::default());
//! fsm.add_state(Mode::Chase, ChaseState::default());
//! fsm.add_transition(Mode::Idle, Signal::PlayerDetected, Mode::Chase, |_| true);
//! fsm.add_auto_transition(Mode::Chase, Mode::Idle, |board| board.target_distance > 250.0);
//! fsm.set_state(Mode::Idle, &mut board)?;
//!
//! fsm.trigger_event(Signal::PlayerDetected, &mut board);
//! fsm.update(&mut board, dt);
//! ```

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;

// ============================================================================
// State Trait
// ============================================================================

/// A state in the finite state machine.
///
/// The lifecycle is:
///
/// 1. `enter()` - Called once when the state becomes active
/// 2. `update()` - Called each tick while active
/// 3. `exit()` - Called once when the state is left
pub trait State<Ctx = ()>: fmt::Debug {
    /// State name for debugging and logging.
    fn name(&self) -> &'static str;

    /// Called when entering this state.
    fn enter(&mut self, _ctx: &mut Ctx) {}

    /// Called each tick while in this state. `dt` is the elapsed time.
    fn update(&mut self, ctx: &mut Ctx, dt: f32);

    /// Called when exiting this state.
    fn exit(&mut self, _ctx: &mut Ctx) {}
}

// ============================================================================
// Triggers and Transitions
// ============================================================================

/// What a transition row reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger<E> {
    /// An explicitly raised event.
    Event(E),
    /// Polled every update.
    Auto,
}

/// Guard evaluated when a transition row is considered.
pub type Condition<Ctx> = Box<dyn Fn(&Ctx) -> bool>;

struct TransitionRow<S, E, Ctx> {
    from: S,
    trigger: Trigger<E>,
    to: S,
    condition: Condition<Ctx>,
}

impl<S: fmt::Debug, E: fmt::Debug, Ctx> fmt::Debug for TransitionRow<S, E, Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} --{:?}--> {:?}", self.from, self.trigger, self.to)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// State machine configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsmError {
    /// `set_state` was called with an identity that was never registered
    UnregisteredState(String),
    /// A transition points at an identity that was never registered
    UnregisteredTarget {
        /// Source state
        from: String,
        /// Unknown target state
        to: String,
    },
    /// The machine handle does not belong to this state machine
    UnknownMachine(usize),
}

impl fmt::Display for FsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnregisteredState(state) => write!(f, "State {state} is not registered"),
            Self::UnregisteredTarget { from, to } => {
                write!(f, "Transition {from} -> {to} targets an unregistered state")
            }
            Self::UnknownMachine(index) => write!(f, "No machine with index {index}"),
        }
    }
}

impl std::error::Error for FsmError {}

// ============================================================================
// Machine (one level of the hierarchy)
// ============================================================================

/// Handle to one machine inside a [`StateMachine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MachineId(usize);

impl MachineId {
    /// The root machine of every [`StateMachine`].
    pub const ROOT: Self = Self(0);

    /// Get the raw index value.
    #[must_use]
    #[inline]
    pub const fn raw(self) -> usize {
        self.0
    }
}

/// A single level of a hierarchical state machine.
///
/// Holds the registered states, the transition table, the active and previous
/// state, and the arena indices of its parent and children.
pub struct Machine<S, E, Ctx = ()> {
    states: FxHashMap<S, Box<dyn State<Ctx>>>,
    transitions: Vec<TransitionRow<S, E, Ctx>>,
    current: Option<S>,
    previous: Option<S>,
    parent: Option<MachineId>,
    children: Vec<MachineId>,
}

impl<S, E, Ctx> Machine<S, E, Ctx>
where
    S: Copy + Eq + Hash + fmt::Debug,
    E: Copy + Eq + fmt::Debug,
{
    fn new(parent: Option<MachineId>) -> Self {
        Self {
            states: FxHashMap::default(),
            transitions: Vec::new(),
            current: None,
            previous: None,
            parent,
            children: Vec::new(),
        }
    }

    /// Register a state, replacing any state registered under the same identity.
    ///
    /// Replacing the active state's object does not call `exit`/`enter`.
    pub fn add_state(&mut self, id: S, state: impl State<Ctx> + 'static) {
        self.states.insert(id, Box::new(state));
    }

    /// Check if an identity is registered
    #[must_use]
    pub fn has_state(&self, id: S) -> bool {
        self.states.contains_key(&id)
    }

    /// Activate a registered state, exiting the current one first.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::UnregisteredState`] if `id` was never registered.
    /// This is a setup bug; callers should abort construction.
    pub fn set_state(&mut self, id: S, ctx: &mut Ctx) -> Result<(), FsmError> {
        if !self.states.contains_key(&id) {
            return Err(FsmError::UnregisteredState(format!("{id:?}")));
        }
        self.switch_to(id, ctx);
        Ok(())
    }

    /// Register an event-triggered transition.
    ///
    /// Re-registering the same `(from, event, to)` replaces its condition and
    /// keeps its original position in the table.
    pub fn add_transition(
        &mut self,
        from: S,
        event: E,
        to: S,
        condition: impl Fn(&Ctx) -> bool + 'static,
    ) {
        self.insert_row(from, Trigger::Event(event), to, Box::new(condition));
    }

    /// Register a transition polled on every update.
    pub fn add_auto_transition(&mut self, from: S, to: S, condition: impl Fn(&Ctx) -> bool + 'static) {
        self.insert_row(from, Trigger::Auto, to, Box::new(condition));
    }

    fn insert_row(&mut self, from: S, trigger: Trigger<E>, to: S, condition: Condition<Ctx>) {
        if let Some(row) = self
            .transitions
            .iter_mut()
            .find(|row| row.from == from && row.trigger == trigger && row.to == to)
        {
            row.condition = condition;
        } else {
            self.transitions.push(TransitionRow {
                from,
                trigger,
                to,
                condition,
            });
        }
    }

    /// Identity of the active state
    #[must_use]
    pub fn current_state(&self) -> Option<S> {
        self.current
    }

    /// Name of the active state
    #[must_use]
    pub fn current_state_name(&self) -> Option<&'static str> {
        self.current
            .and_then(|id| self.states.get(&id))
            .map(|state| state.name())
    }

    /// Identity of the state active before the last switch
    #[must_use]
    pub fn previous_state(&self) -> Option<S> {
        self.previous
    }

    /// Check if `id` is the active state
    #[must_use]
    pub fn is_in_state(&self, id: S) -> bool {
        self.current == Some(id)
    }

    /// Switch back to the previous state. Returns false if there is none.
    pub fn revert_to_previous(&mut self, ctx: &mut Ctx) -> bool {
        match self.previous {
            Some(previous) if self.current.is_some() => {
                self.switch_to(previous, ctx);
                true
            }
            _ => false,
        }
    }

    /// Parent machine, if this is a child
    #[must_use]
    pub fn parent(&self) -> Option<MachineId> {
        self.parent
    }

    /// Child machines in creation order
    #[must_use]
    pub fn children(&self) -> &[MachineId] {
        &self.children
    }

    /// Number of registered transitions
    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Report the first transition whose target was never registered.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::UnregisteredTarget`]; such transitions would match
    /// at runtime but never fire.
    pub fn validate(&self) -> Result<(), FsmError> {
        match self.transitions.iter().find(|row| !self.states.contains_key(&row.to)) {
            Some(row) => Err(FsmError::UnregisteredTarget {
                from: format!("{:?}", row.from),
                to: format!("{:?}", row.to),
            }),
            None => Ok(()),
        }
    }

    /// Fire the first matching row for `trigger` whose target is registered.
    ///
    /// Matching rows with an unregistered target are skipped with a warning.
    /// Returns true when a state change happened.
    fn fire(&mut self, trigger: Trigger<E>, ctx: &mut Ctx) -> bool {
        let Some(current) = self.current else {
            return false;
        };

        let mut target = None;
        for row in &self.transitions {
            if row.from != current || row.trigger != trigger || !(row.condition)(&*ctx) {
                continue;
            }
            if self.states.contains_key(&row.to) {
                target = Some(row.to);
                break;
            }
            log::warn!(
                "Skipped transition {current:?} --{trigger:?}--> {:?}: target not registered",
                row.to
            );
        }

        match target {
            Some(target) => {
                self.switch_to(target, ctx);
                true
            }
            None => false,
        }
    }

    fn switch_to(&mut self, target: S, ctx: &mut Ctx) {
        if let Some(current) = self.current {
            if let Some(state) = self.states.get_mut(&current) {
                state.exit(ctx);
            }
            self.previous = Some(current);
        }

        log::debug!("State change: {:?} -> {:?}", self.current, target);
        self.current = Some(target);
        if let Some(state) = self.states.get_mut(&target) {
            state.enter(ctx);
        }
    }

    fn update_current(&mut self, ctx: &mut Ctx, dt: f32) {
        if let Some(state) = self.current.and_then(|id| self.states.get_mut(&id)) {
            state.update(ctx, dt);
        }
    }
}

impl<S: fmt::Debug, E: fmt::Debug, Ctx> fmt::Debug for Machine<S, E, Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("current", &self.current)
            .field("previous", &self.previous)
            .field("states", &self.states.len())
            .field("transitions", &self.transitions)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish()
    }
}

// ============================================================================
// State Machine (hierarchy)
// ============================================================================

/// A hierarchical state machine: an arena of [`Machine`]s rooted at
/// [`MachineId::ROOT`].
///
/// Root-level convenience methods mirror [`Machine`]; use
/// [`StateMachine::machine_mut`] to configure child machines.
///
/// # Type Parameters
///
/// - `S`: State identity
/// - `E`: Event type
/// - `Ctx`: Context passed to states and conditions
pub struct StateMachine<S, E, Ctx = ()> {
    machines: Vec<Machine<S, E, Ctx>>,
}

impl<S, E, Ctx> Default for StateMachine<S, E, Ctx>
where
    S: Copy + Eq + Hash + fmt::Debug,
    E: Copy + Eq + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, E, Ctx> StateMachine<S, E, Ctx>
where
    S: Copy + Eq + Hash + fmt::Debug,
    E: Copy + Eq + fmt::Debug,
{
    /// Create a state machine with an empty root and no active state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            machines: vec![Machine::new(None)],
        }
    }

    /// Create a child machine under `parent`. Children are never detached.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::UnknownMachine`] if `parent` is not in this arena.
    pub fn add_child(&mut self, parent: MachineId) -> Result<MachineId, FsmError> {
        if parent.0 >= self.machines.len() {
            return Err(FsmError::UnknownMachine(parent.0));
        }
        let id = MachineId(self.machines.len());
        self.machines.push(Machine::new(Some(parent)));
        self.machines[parent.0].children.push(id);
        Ok(id)
    }

    /// Get a machine by handle
    #[must_use]
    pub fn machine(&self, id: MachineId) -> Option<&Machine<S, E, Ctx>> {
        self.machines.get(id.0)
    }

    /// Get a mutable machine by handle
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::UnknownMachine`] if `id` is not in this arena.
    pub fn machine_mut(&mut self, id: MachineId) -> Result<&mut Machine<S, E, Ctx>, FsmError> {
        self.machines.get_mut(id.0).ok_or(FsmError::UnknownMachine(id.0))
    }

    /// The root machine
    #[must_use]
    pub fn root(&self) -> &Machine<S, E, Ctx> {
        &self.machines[0]
    }

    /// The root machine, mutably
    pub fn root_mut(&mut self) -> &mut Machine<S, E, Ctx> {
        &mut self.machines[0]
    }

    /// Number of machines including the root
    #[must_use]
    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    /// Register a state on the root machine.
    pub fn add_state(&mut self, id: S, state: impl State<Ctx> + 'static) {
        self.root_mut().add_state(id, state);
    }

    /// Activate a state on the root machine.
    ///
    /// # Errors
    ///
    /// Returns [`FsmError::UnregisteredState`] if `id` was never registered.
    pub fn set_state(&mut self, id: S, ctx: &mut Ctx) -> Result<(), FsmError> {
        self.root_mut().set_state(id, ctx)
    }

    /// Register an event-triggered transition on the root machine.
    pub fn add_transition(
        &mut self,
        from: S,
        event: E,
        to: S,
        condition: impl Fn(&Ctx) -> bool + 'static,
    ) {
        self.root_mut().add_transition(from, event, to, condition);
    }

    /// Register an automatic transition on the root machine.
    pub fn add_auto_transition(&mut self, from: S, to: S, condition: impl Fn(&Ctx) -> bool + 'static) {
        self.root_mut().add_auto_transition(from, to, condition);
    }

    /// Active state of the root machine
    #[must_use]
    pub fn current_state(&self) -> Option<S> {
        self.root().current_state()
    }

    /// Check if the root machine is in `id`
    #[must_use]
    pub fn is_in_state(&self, id: S) -> bool {
        self.root().is_in_state(id)
    }

    /// Previous state of the root machine
    #[must_use]
    pub fn previous_state(&self) -> Option<S> {
        self.root().previous_state()
    }

    /// Revert the root machine to its previous state
    pub fn revert_to_previous(&mut self, ctx: &mut Ctx) -> bool {
        self.root_mut().revert_to_previous(ctx)
    }

    /// Raise an event at the root.
    ///
    /// At most one transition fires per machine. If nothing fires at the root
    /// the event is forwarded to every child, recursively.
    pub fn trigger_event(&mut self, event: E, ctx: &mut Ctx) {
        self.dispatch(MachineId::ROOT, event, ctx);
    }

    /// Raise an event at a specific machine and its subtree.
    pub fn trigger_event_at(&mut self, id: MachineId, event: E, ctx: &mut Ctx) {
        if id.0 < self.machines.len() {
            self.dispatch(id, event, ctx);
        }
    }

    fn dispatch(&mut self, id: MachineId, event: E, ctx: &mut Ctx) {
        let machine = &mut self.machines[id.0];
        if machine.current.is_none() {
            return;
        }
        if machine.fire(Trigger::Event(event), ctx) {
            return;
        }
        for i in 0..self.machines[id.0].children.len() {
            let child = self.machines[id.0].children[i];
            self.dispatch(child, event, ctx);
        }
    }

    /// Advance one tick: the active state, then every child, then the
    /// automatic transitions of this level.
    pub fn update(&mut self, ctx: &mut Ctx, dt: f32) {
        self.update_machine(MachineId::ROOT, ctx, dt);
    }

    fn update_machine(&mut self, id: MachineId, ctx: &mut Ctx, dt: f32) {
        self.machines[id.0].update_current(ctx, dt);
        for i in 0..self.machines[id.0].children.len() {
            let child = self.machines[id.0].children[i];
            self.update_machine(child, ctx, dt);
        }
        self.machines[id.0].fire(Trigger::Auto, ctx);
    }

    /// Validate every machine in the hierarchy.
    ///
    /// # Errors
    ///
    /// Returns the first [`FsmError::UnregisteredTarget`] found.
    pub fn validate(&self) -> Result<(), FsmError> {
        self.machines.iter().try_for_each(Machine::validate)
    }
}

impl<S: fmt::Debug, E: fmt::Debug, Ctx> fmt::Debug for StateMachine<S, E, Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("machines", &self.machines)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
