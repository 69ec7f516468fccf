//! Behavior trees
//!
//! A tree of [`BehaviorNode`]s is evaluated once per tick from the root and
//! returns a [`Status`]. Sequences and selectors remember which child they were
//! running, so a `Running` child is resumed on the next tick without
//! re-evaluating the siblings that already completed.
//!
//! Conditions and actions receive an explicit context value (`&Ctx` /
//! `&mut Ctx`) instead of capturing agent state; the tree itself only holds
//! structure and resume cursors.
//!
//! # Example
//!
//! ```ignore
//! let mut tree = BehaviorTree::new(BehaviorNode::selector(
//!     "Root",
//!     vec![
//!         BehaviorNode::sequence(
//!             "Attack",
//!             vec![
//!                 BehaviorNode::condition("InRange", |ctx: &Board| ctx.distance < 50.0),
//!                 BehaviorNode::action("Strike", |ctx: &mut Board| {
//!                     ctx.strikes += 1;
//!                     Status::Success
//!                 }),
//!             ],
//!         ),
//!         BehaviorNode::action("Wander", |_| Status::Success),
//!     ],
//! ));
//! tree.execute(&mut board);
//! ```

use std::fmt;

/// Result of executing a node for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The node completed successfully.
    Success,
    /// The node failed.
    Failure,
    /// The node has not finished yet and wants to be ticked again.
    Running,
}

/// Completion policy for [`BehaviorNode::Parallel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// A single child reaching the outcome decides it.
    RequireOne,
    /// Every child must reach the outcome.
    RequireAll,
}

/// Side-effect-free predicate evaluated by a condition node.
pub type Predicate<Ctx> = Box<dyn Fn(&Ctx) -> bool>;

/// Operation performed by an action node.
pub type ActionFn<Ctx> = Box<dyn FnMut(&mut Ctx) -> Status>;

/// A node in a behavior tree.
pub enum BehaviorNode<Ctx> {
    /// Runs children in order until one fails (AND).
    Sequence {
        name: String,
        children: Vec<BehaviorNode<Ctx>>,
        cursor: usize,
    },
    /// Runs children in order until one succeeds (OR).
    Selector {
        name: String,
        children: Vec<BehaviorNode<Ctx>>,
        cursor: usize,
    },
    /// Succeeds iff the predicate holds. Never `Running`.
    Condition { name: String, predicate: Predicate<Ctx> },
    /// Performs a side effect and reports its own status.
    Action { name: String, action: ActionFn<Ctx> },
    /// Swaps `Success` and `Failure` of its child.
    Inverter {
        name: String,
        child: Box<BehaviorNode<Ctx>>,
    },
    /// Runs every child each tick and aggregates by policy.
    Parallel {
        name: String,
        success_policy: Policy,
        failure_policy: Policy,
        children: Vec<BehaviorNode<Ctx>>,
    },
}

/// Errors from building a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Tried to add a child to a node that cannot hold a child list
    NotComposite(String),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotComposite(name) => write!(f, "Node '{name}' cannot have children"),
        }
    }
}

impl std::error::Error for TreeError {}

impl<Ctx> BehaviorNode<Ctx> {
    /// Create a sequence node
    pub fn sequence(name: impl Into<String>, children: Vec<BehaviorNode<Ctx>>) -> Self {
        Self::Sequence {
            name: name.into(),
            children,
            cursor: 0,
        }
    }

    /// Create a selector node
    pub fn selector(name: impl Into<String>, children: Vec<BehaviorNode<Ctx>>) -> Self {
        Self::Selector {
            name: name.into(),
            children,
            cursor: 0,
        }
    }

    /// Create a condition node
    pub fn condition(name: impl Into<String>, predicate: impl Fn(&Ctx) -> bool + 'static) -> Self {
        Self::Condition {
            name: name.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Create an action node
    pub fn action(
        name: impl Into<String>,
        action: impl FnMut(&mut Ctx) -> Status + 'static,
    ) -> Self {
        Self::Action {
            name: name.into(),
            action: Box::new(action),
        }
    }

    /// Create an inverter around `child`
    pub fn inverter(name: impl Into<String>, child: BehaviorNode<Ctx>) -> Self {
        Self::Inverter {
            name: name.into(),
            child: Box::new(child),
        }
    }

    /// Create a parallel node
    pub fn parallel(
        name: impl Into<String>,
        success_policy: Policy,
        failure_policy: Policy,
        children: Vec<BehaviorNode<Ctx>>,
    ) -> Self {
        Self::Parallel {
            name: name.into(),
            success_policy,
            failure_policy,
            children,
        }
    }

    /// Append a child to a composite node.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotComposite`] for conditions, actions and inverters.
    pub fn add_child(&mut self, child: BehaviorNode<Ctx>) -> Result<(), TreeError> {
        match self {
            Self::Sequence { children, .. }
            | Self::Selector { children, .. }
            | Self::Parallel { children, .. } => {
                children.push(child);
                Ok(())
            }
            other => Err(TreeError::NotComposite(other.name().to_string())),
        }
    }

    /// Node name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Sequence { name, .. }
            | Self::Selector { name, .. }
            | Self::Condition { name, .. }
            | Self::Action { name, .. }
            | Self::Inverter { name, .. }
            | Self::Parallel { name, .. } => name,
        }
    }

    /// Child nodes (empty for leaves, one for inverters)
    #[must_use]
    pub fn children(&self) -> &[BehaviorNode<Ctx>] {
        match self {
            Self::Sequence { children, .. }
            | Self::Selector { children, .. }
            | Self::Parallel { children, .. } => children,
            Self::Inverter { child, .. } => std::slice::from_ref(child.as_ref()),
            Self::Condition { .. } | Self::Action { .. } => &[],
        }
    }

    /// Resume cursor of a sequence or selector
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        match self {
            Self::Sequence { cursor, .. } | Self::Selector { cursor, .. } => Some(*cursor),
            _ => None,
        }
    }

    /// Reset every resume cursor in this subtree to the first child.
    pub fn reset(&mut self) {
        match self {
            Self::Sequence { children, cursor, .. } | Self::Selector { children, cursor, .. } => {
                *cursor = 0;
                children.iter_mut().for_each(Self::reset);
            }
            Self::Parallel { children, .. } => children.iter_mut().for_each(Self::reset),
            Self::Inverter { child, .. } => child.reset(),
            Self::Condition { .. } | Self::Action { .. } => {}
        }
    }

    /// Execute this node for one tick.
    pub fn execute(&mut self, ctx: &mut Ctx) -> Status {
        match self {
            Self::Sequence { children, cursor, .. } => {
                if children.is_empty() {
                    return Status::Success;
                }
                while *cursor < children.len() {
                    match children[*cursor].execute(ctx) {
                        Status::Running => return Status::Running,
                        Status::Failure => {
                            *cursor = 0;
                            return Status::Failure;
                        }
                        Status::Success => *cursor += 1,
                    }
                }
                *cursor = 0;
                Status::Success
            }

            Self::Selector { children, cursor, .. } => {
                if children.is_empty() {
                    return Status::Failure;
                }
                while *cursor < children.len() {
                    match children[*cursor].execute(ctx) {
                        Status::Running => return Status::Running,
                        Status::Success => {
                            *cursor = 0;
                            return Status::Success;
                        }
                        Status::Failure => *cursor += 1,
                    }
                }
                *cursor = 0;
                Status::Failure
            }

            Self::Condition { predicate, .. } => {
                if predicate(&*ctx) {
                    Status::Success
                } else {
                    Status::Failure
                }
            }

            Self::Action { action, .. } => action(ctx),

            Self::Inverter { child, .. } => match child.execute(ctx) {
                Status::Success => Status::Failure,
                Status::Failure => Status::Success,
                Status::Running => Status::Running,
            },

            Self::Parallel {
                success_policy,
                failure_policy,
                children,
                ..
            } => {
                let mut successes = 0;
                let mut failures = 0;

                for child in children.iter_mut() {
                    match child.execute(ctx) {
                        Status::Success => {
                            successes += 1;
                            if *success_policy == Policy::RequireOne {
                                return Status::Success;
                            }
                        }
                        Status::Failure => {
                            failures += 1;
                            if *failure_policy == Policy::RequireOne {
                                return Status::Failure;
                            }
                        }
                        Status::Running => {}
                    }
                }

                if *success_policy == Policy::RequireAll && successes == children.len() {
                    return Status::Success;
                }
                if *failure_policy == Policy::RequireAll && failures == children.len() {
                    return Status::Failure;
                }
                Status::Running
            }
        }
    }
}

impl<Ctx> fmt::Debug for BehaviorNode<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence { name, children, cursor } => f
                .debug_struct("Sequence")
                .field("name", name)
                .field("cursor", cursor)
                .field("children", children)
                .finish(),
            Self::Selector { name, children, cursor } => f
                .debug_struct("Selector")
                .field("name", name)
                .field("cursor", cursor)
                .field("children", children)
                .finish(),
            Self::Condition { name, .. } => write!(f, "Condition({name})"),
            Self::Action { name, .. } => write!(f, "Action({name})"),
            Self::Inverter { name, child } => f
                .debug_struct("Inverter")
                .field("name", name)
                .field("child", child)
                .finish(),
            Self::Parallel {
                name,
                success_policy,
                failure_policy,
                children,
            } => f
                .debug_struct("Parallel")
                .field("name", name)
                .field("success_policy", success_policy)
                .field("failure_policy", failure_policy)
                .field("children", children)
                .finish(),
        }
    }
}

/// Root of a behavior tree plus tick bookkeeping.
pub struct BehaviorTree<Ctx> {
    root: BehaviorNode<Ctx>,
    ticks: u64,
    last_status: Option<Status>,
}

impl<Ctx> BehaviorTree<Ctx> {
    /// Wrap a root node
    #[must_use]
    pub fn new(root: BehaviorNode<Ctx>) -> Self {
        Self {
            root,
            ticks: 0,
            last_status: None,
        }
    }

    /// Execute the tree for one tick
    pub fn execute(&mut self, ctx: &mut Ctx) -> Status {
        let status = self.root.execute(ctx);
        self.ticks += 1;
        if self.last_status != Some(status) {
            log::trace!(
                "Behavior tree '{}' -> {:?} at tick {}",
                self.root.name(),
                status,
                self.ticks
            );
        }
        self.last_status = Some(status);
        status
    }

    /// Root node
    #[must_use]
    pub fn root(&self) -> &BehaviorNode<Ctx> {
        &self.root
    }

    /// Number of ticks executed
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Status returned by the most recent tick
    #[must_use]
    pub fn last_status(&self) -> Option<Status> {
        self.last_status
    }

    /// Reset all resume cursors
    pub fn reset(&mut self) {
        self.root.reset();
        self.last_status = None;
    }
}

impl<Ctx> fmt::Debug for BehaviorTree<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorTree")
            .field("root", &self.root)
            .field("ticks", &self.ticks)
            .field("last_status", &self.last_status)
            .finish()
    }
}
