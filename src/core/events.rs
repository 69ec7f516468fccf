//! Simulation event queue
//!
//! A double-buffered queue of things that happened during a tick: agent mode
//! changes, path planning outcomes, grid rebuilds. Producers push during a
//! tick; the simulation swaps at the end so consumers read a stable batch.
//!
//! # Example
//!
//! ```ignore
//! sim.step(1.0 / 60.0);
//! for event in sim.events().iter() {
//!     if let SimEvent::PathNotFound { goal, .. } = event {
//!         log::warn!("unreachable goal {goal}");
//!     }
//! }
//! ```

use std::collections::VecDeque;

use glam::Vec2;

use super::simulation::AiMode;

// ============================================================================
// Event Types
// ============================================================================

/// Something that happened during a simulation tick.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SimEvent {
    /// The walkability grid was rebuilt
    GridRebuilt {
        /// Width in cells
        width: usize,
        /// Height in cells
        height: usize,
        /// Number of blocked cells
        blocked: usize,
    },

    /// The active agent kind changed
    ModeSwitched {
        /// Previous kind
        from: AiMode,
        /// New kind
        to: AiMode,
    },

    /// The agent's own behavior label changed (patrol, chase, flee...)
    AgentStateChanged {
        /// Label before the tick
        from: &'static str,
        /// Label after the tick
        to: &'static str,
    },

    /// A path was planned
    PathPlanned {
        /// Number of waypoints
        waypoints: usize,
        /// Path length in world units
        length: f32,
    },

    /// A path search found nothing
    PathNotFound {
        /// Search start
        start: Vec2,
        /// Search goal
        goal: Vec2,
    },
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered event queue.
///
/// Events pushed during tick N become readable after the swap at the end of
/// tick N and stay readable until the next swap.
#[derive(Debug)]
pub struct EventQueue {
    pending: VecDeque<SimEvent>,
    processing: VecDeque<SimEvent>,
}

impl EventQueue {
    const DEFAULT_CAPACITY: usize = 16;

    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create an empty queue with room for `capacity` events per buffer
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            processing: VecDeque::with_capacity(capacity),
        }
    }

    /// Record an event for the current tick
    #[inline]
    pub fn push(&mut self, event: SimEvent) {
        self.pending.push_back(event);
    }

    /// Publish pending events and drop the previous batch
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Events published by the last swap
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.processing.iter()
    }

    /// Take the published events
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = SimEvent> + '_ {
        self.processing.drain(..)
    }

    /// No published events
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    /// Number of published events
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    /// Number of events waiting for the next swap
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_queue_push_and_swap() {
        let mut queue = EventQueue::new();

        queue.push(SimEvent::PathPlanned {
            waypoints: 3,
            length: 40.0,
        });
        assert!(queue.is_empty(), "Events should not be visible before swap");

        queue.swap();
        assert_eq!(queue.len(), 1);
        let events: Vec<_> = queue.iter().collect();
        assert!(matches!(events[0], SimEvent::PathPlanned { waypoints: 3, .. }));
    }

    #[test]
    fn test_event_queue_double_buffer_isolation() {
        let mut queue = EventQueue::new();

        queue.push(SimEvent::AgentStateChanged {
            from: "Patrol",
            to: "Chase",
        });
        queue.swap();

        queue.push(SimEvent::AgentStateChanged {
            from: "Chase",
            to: "Attack",
        });

        let events: Vec<_> = queue.iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SimEvent::AgentStateChanged { to: "Chase", .. }));

        queue.swap();
        let events: Vec<_> = queue.iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SimEvent::AgentStateChanged { to: "Attack", .. }));
    }

    #[test]
    fn test_event_queue_drain_and_clear() {
        let mut queue = EventQueue::new();

        queue.push(SimEvent::ModeSwitched {
            from: AiMode::AStar,
            to: AiMode::Fsm,
        });
        queue.push(SimEvent::PathNotFound {
            start: Vec2::ZERO,
            goal: Vec2::ONE,
        });
        queue.swap();

        let events: Vec<_> = queue.drain().collect();
        assert_eq!(events.len(), 2);
        assert!(queue.is_empty());

        queue.push(SimEvent::GridRebuilt {
            width: 1,
            height: 1,
            blocked: 0,
        });
        queue.clear();
        assert_eq!(queue.pending_count(), 0);
    }
}
