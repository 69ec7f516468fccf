//! World primitives shared by agents
//!
//! Obstacles, kinematic bodies, the pursued target and the read-only view an
//! agent receives each tick.

mod body;
mod obstacle;
mod target;

pub use body::AgentBody;
pub use obstacle::Obstacle;
pub use target::Target;

use glam::Vec2;
use rand::Rng;

use crate::ai::GridMap;

/// Read-only world state handed to agents each tick
#[derive(Debug, Clone, Copy)]
pub struct WorldView<'a> {
    /// Shared walkability grid
    pub grid: &'a GridMap,
    /// Obstacles the grid was built from
    pub obstacles: &'a [Obstacle],
    /// Position of the pursued target
    pub target: Vec2,
}

impl WorldView<'_> {
    /// World extent covered by the grid
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.grid.world_size()
    }
}

/// Pick the center of a random cell, retrying up to `attempts` times for a
/// walkable one. The last candidate is returned even if it is blocked.
pub fn random_cell_center(grid: &GridMap, rng: &mut impl Rng, attempts: usize) -> Vec2 {
    let mut candidate = grid.grid_to_world(glam::IVec2::ZERO);
    if grid.width() == 0 || grid.height() == 0 {
        return candidate;
    }

    for _ in 0..attempts.max(1) {
        let cell = glam::IVec2::new(
            rng.gen_range(0..grid.width()) as i32,
            rng.gen_range(0..grid.height()) as i32,
        );
        candidate = grid.grid_to_world(cell);
        if grid.is_cell_walkable(cell) {
            break;
        }
    }
    candidate
}

/// Pick a random point at `min..max` distance from `origin`, clamped to stay
/// `margin` inside a world of `size`.
pub fn random_point_around(
    origin: Vec2,
    min: f32,
    max: f32,
    size: Vec2,
    margin: f32,
    rng: &mut impl Rng,
) -> Vec2 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let distance = if max > min { rng.gen_range(min..max) } else { min };
    let point = origin + Vec2::new(angle.cos(), angle.sin()) * distance;

    let low = Vec2::splat(margin);
    let high = (size - Vec2::splat(margin)).max(low);
    point.max(low).min(high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_random_cell_center_prefers_walkable() {
        // Everything blocked except cell (3, 0)
        let grid = GridMap::new(
            40.0,
            40.0,
            10.0,
            &[Obstacle::new(0.0, 12.0, 40.0, 28.0), Obstacle::new(0.0, 0.0, 25.0, 9.0)],
        );
        let mut rng = StdRng::seed_from_u64(7);

        let point = random_cell_center(&grid, &mut rng, 1000);
        assert_eq!(point, Vec2::new(35.0, 5.0));
    }

    #[test]
    fn test_random_point_around_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let size = Vec2::new(200.0, 100.0);

        for _ in 0..100 {
            let p = random_point_around(Vec2::new(10.0, 10.0), 50.0, 250.0, size, 20.0, &mut rng);
            assert!(p.x >= 20.0 && p.x <= 180.0);
            assert!(p.y >= 20.0 && p.y <= 80.0);
        }
    }
}
