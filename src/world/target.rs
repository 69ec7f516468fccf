//! The pursued target (the "player" in a scenario)

use glam::Vec2;

/// A point that walks a looping route at constant speed, ignoring obstacles.
#[derive(Debug, Clone)]
pub struct Target {
    position: Vec2,
    route: Vec<Vec2>,
    next: usize,
    speed: f32,
}

impl Target {
    /// Create a target at `position`. An empty route keeps it still.
    #[must_use]
    pub fn new(position: Vec2, route: Vec<Vec2>, speed: f32) -> Self {
        Self {
            position,
            route,
            next: 0,
            speed,
        }
    }

    /// Current position
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Teleport the target
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Advance along the route by `speed * dt`
    pub fn advance(&mut self, dt: f32) {
        if self.route.is_empty() || self.speed <= 0.0 || dt <= 0.0 {
            return;
        }

        let mut budget = self.speed * dt;
        // Bounded so a degenerate route of identical points cannot spin forever
        for _ in 0..=self.route.len() {
            let waypoint = self.route[self.next];
            let to_waypoint = waypoint - self.position;
            let distance = to_waypoint.length();

            if distance > budget {
                self.position += to_waypoint / distance * budget;
                return;
            }

            self.position = waypoint;
            budget -= distance;
            self.next = (self.next + 1) % self.route.len();
            if budget <= 0.0 {
                return;
            }
        }
    }
}
