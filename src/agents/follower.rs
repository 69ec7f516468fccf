//! Waypoint following

use glam::Vec2;

use crate::ai::{PathResult, Seek, SteeringBehavior};
use crate::world::AgentBody;

/// Walks an agent body along a list of waypoints.
#[derive(Debug, Clone)]
pub struct PathFollower {
    waypoints: Vec<Vec2>,
    index: usize,
    threshold: f32,
}

impl PathFollower {
    /// Create an idle follower that advances once within `threshold` of a waypoint
    #[must_use]
    pub fn new(threshold: f32) -> Self {
        Self {
            waypoints: Vec::new(),
            index: 0,
            threshold,
        }
    }

    /// Replace the route and restart from its first waypoint
    pub fn set_path(&mut self, path: PathResult) {
        self.waypoints = path.waypoints;
        self.index = 0;
    }

    /// Drop the current route
    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.index = 0;
    }

    /// Remaining route, current waypoint first
    #[must_use]
    pub fn remaining(&self) -> &[Vec2] {
        self.waypoints.get(self.index..).unwrap_or(&[])
    }

    /// The waypoint being steered towards
    #[must_use]
    pub fn current_waypoint(&self) -> Option<Vec2> {
        self.waypoints.get(self.index).copied()
    }

    /// True once every waypoint has been reached (or there is no route)
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.index >= self.waypoints.len()
    }

    /// Set `body` velocity towards the current waypoint at `speed`.
    ///
    /// A waypoint closer than the threshold is consumed first. The body stops
    /// when the route is exhausted.
    pub fn steer(&mut self, body: &mut AgentBody, speed: f32) {
        let Some(mut waypoint) = self.current_waypoint() else {
            body.stop();
            return;
        };

        if body.distance_to(waypoint) < self.threshold {
            self.index += 1;
            match self.current_waypoint() {
                Some(next) => waypoint = next,
                None => {
                    body.stop();
                    return;
                }
            }
        }

        let steering = Seek::new(waypoint, speed).calculate(body.position);
        body.velocity = steering.linear;
        if let Some(heading) = steering.heading() {
            body.rotation = heading;
        }
    }
}
