//! Steering behaviors for AI movement
//!
//! Kinematic steering: each behavior yields the desired velocity directly,
//! which agents assign to their body for the tick.

use glam::Vec2;

/// Output from a steering behavior
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringOutput {
    /// Desired velocity
    pub linear: Vec2,
}

impl SteeringOutput {
    /// Zero steering
    pub const ZERO: Self = Self { linear: Vec2::ZERO };

    /// Scale the output
    #[must_use]
    pub fn scale(self, factor: f32) -> Self {
        Self {
            linear: self.linear * factor,
        }
    }

    /// Heading of the output in radians, if it is moving
    #[must_use]
    pub fn heading(&self) -> Option<f32> {
        (self.linear != Vec2::ZERO).then(|| self.linear.y.atan2(self.linear.x))
    }
}

/// Trait for steering behaviors
pub trait SteeringBehavior {
    /// Calculate steering from the agent position
    fn calculate(&self, position: Vec2) -> SteeringOutput;
}

/// Seek behavior - move towards target at full speed
#[derive(Debug, Clone)]
pub struct Seek {
    /// Target position
    pub target: Vec2,
    /// Travel speed
    pub max_speed: f32,
}

impl Seek {
    /// Create a new seek behavior
    #[must_use]
    pub fn new(target: Vec2, max_speed: f32) -> Self {
        Self { target, max_speed }
    }
}

impl SteeringBehavior for Seek {
    fn calculate(&self, position: Vec2) -> SteeringOutput {
        let direction = (self.target - position).normalize_or_zero();
        SteeringOutput {
            linear: direction * self.max_speed,
        }
    }
}

/// Flee behavior - move away from target
#[derive(Debug, Clone)]
pub struct Flee {
    /// Target position to flee from
    pub target: Vec2,
    /// Travel speed
    pub max_speed: f32,
}

impl Flee {
    /// Create a new flee behavior
    #[must_use]
    pub fn new(target: Vec2, max_speed: f32) -> Self {
        Self { target, max_speed }
    }
}

impl SteeringBehavior for Flee {
    fn calculate(&self, position: Vec2) -> SteeringOutput {
        let direction = (position - self.target).normalize_or_zero();
        SteeringOutput {
            linear: direction * self.max_speed,
        }
    }
}
