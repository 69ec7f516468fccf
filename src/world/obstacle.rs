//! Axis-aligned obstacle rectangles

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A static, axis-aligned rectangular obstacle in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Top-left corner
    pub position: Vec2,
    /// Size (width, height)
    pub size: Vec2,
}

impl Obstacle {
    /// Create a new obstacle
    #[must_use]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    /// Left edge
    #[must_use]
    pub fn left(&self) -> f32 {
        self.position.x
    }

    /// Top edge
    #[must_use]
    pub fn top(&self) -> f32 {
        self.position.y
    }

    /// Right edge
    #[must_use]
    pub fn right(&self) -> f32 {
        self.position.x + self.size.x
    }

    /// Bottom edge
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.position.y + self.size.y
    }

    /// Get the bounds as (min, max)
    #[must_use]
    pub fn bounds(&self) -> (Vec2, Vec2) {
        (self.position, self.position + self.size)
    }

    /// Center of the rectangle
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.position + self.size * 0.5
    }

    /// Check if a point is inside the rectangle (edges inclusive)
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    /// Check whether a circle overlaps the rectangle.
    ///
    /// Uses the closest point on the rectangle to the circle center.
    #[must_use]
    pub fn intersects_circle(&self, center: Vec2, radius: f32) -> bool {
        let (min, max) = self.bounds();
        let closest = center.max(min).min(max);
        center.distance(closest) < radius
    }
}
