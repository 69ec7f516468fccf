//! Kinematic agent body

use glam::Vec2;

use super::Obstacle;

/// Position, velocity and facing of a circular agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentBody {
    /// Position in world space
    pub position: Vec2,
    /// Velocity in world units per second
    pub velocity: Vec2,
    /// Facing angle in radians
    pub rotation: f32,
    /// Collision radius
    pub radius: f32,
}

impl AgentBody {
    /// Create a body at rest
    #[must_use]
    pub fn new(position: Vec2, radius: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            radius,
        }
    }

    /// Stop moving
    pub fn stop(&mut self) {
        self.velocity = Vec2::ZERO;
    }

    /// Turn to face `direction`; a zero direction keeps the current facing
    pub fn face(&mut self, direction: Vec2) {
        if direction != Vec2::ZERO {
            self.rotation = direction.y.atan2(direction.x);
        }
    }

    /// Turn to face a world point
    pub fn face_towards(&mut self, point: Vec2) {
        self.face(point - self.position);
    }

    /// Distance to a world point
    #[must_use]
    pub fn distance_to(&self, point: Vec2) -> f32 {
        self.position.distance(point)
    }

    /// Move freely by `velocity * dt`
    pub fn integrate(&mut self, dt: f32) {
        self.position += self.velocity * dt;
    }

    /// Move by `velocity * dt` without entering any obstacle.
    ///
    /// A blocked move slides along one axis if that axis is clear, otherwise
    /// the body stops. Returns whether the body moved.
    pub fn integrate_with_obstacles(&mut self, dt: f32, obstacles: &[Obstacle]) -> bool {
        let delta = self.velocity * dt;
        let candidates = [
            delta,
            Vec2::new(delta.x, 0.0),
            Vec2::new(0.0, delta.y),
        ];

        for candidate in candidates {
            if candidate == Vec2::ZERO {
                continue;
            }
            let next = self.position + candidate;
            if !obstacles.iter().any(|o| o.intersects_circle(next, self.radius)) {
                self.position = next;
                return true;
            }
        }

        self.stop();
        false
    }
}
