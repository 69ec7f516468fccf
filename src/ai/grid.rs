//! Walkability grid over a rectangular world
//!
//! The world is discretized into square cells. A cell is blocked when any
//! obstacle rectangle (edges inclusive, clipped to the grid) touches it.

use std::fmt;

use glam::{IVec2, Vec2};
use smallvec::SmallVec;

use crate::world::Obstacle;

/// Moore neighborhood offsets, column-major (dx outer, dy inner).
const NEIGHBOR_OFFSETS: [IVec2; 8] = [
    IVec2::new(-1, -1),
    IVec2::new(-1, 0),
    IVec2::new(-1, 1),
    IVec2::new(0, -1),
    IVec2::new(0, 1),
    IVec2::new(1, -1),
    IVec2::new(1, 0),
    IVec2::new(1, 1),
];

/// Largest grid [`GridMap::rebuild`] will allocate, in cells.
pub const MAX_CELLS: usize = 1 << 24;

/// Neighbor list returned by [`GridMap::neighbors`]; never more than 8 entries.
pub type Neighbors = SmallVec<[Vec2; 8]>;

/// A 2D walkability grid
#[derive(Debug, Clone)]
pub struct GridMap {
    /// Width in cells
    width: usize,
    /// Height in cells
    height: usize,
    /// Cell size in world units
    cell_size: f32,
    /// Blocked cells (true = blocked), row-major
    blocked: Vec<bool>,
}

impl GridMap {
    /// Build a grid for a `world_width × world_height` world.
    #[must_use]
    pub fn new(world_width: f32, world_height: f32, cell_size: f32, obstacles: &[Obstacle]) -> Self {
        let mut grid = Self {
            width: 0,
            height: 0,
            cell_size,
            blocked: Vec::new(),
        };
        grid.rebuild(world_width, world_height, cell_size, obstacles);
        grid
    }

    /// Clear every cell and re-mark the cells overlapped by `obstacles`.
    ///
    /// The whole grid is replaced; dimensions may change. A non-positive cell
    /// size, or a world needing more than [`MAX_CELLS`] cells, produces an
    /// empty grid on which nothing is walkable.
    pub fn rebuild(
        &mut self,
        world_width: f32,
        world_height: f32,
        cell_size: f32,
        obstacles: &[Obstacle],
    ) {
        let (width, height) = if cell_size > 0.0 {
            (
                (world_width / cell_size).floor().max(0.0) as usize,
                (world_height / cell_size).floor().max(0.0) as usize,
            )
        } else {
            (0, 0)
        };
        let (width, height) = match width.checked_mul(height) {
            Some(cells) if cells <= MAX_CELLS => (width, height),
            _ => {
                log::warn!(
                    "Grid of {width}x{height} cells exceeds {MAX_CELLS} cells; leaving it empty"
                );
                (0, 0)
            }
        };

        self.width = width;
        self.height = height;
        self.cell_size = cell_size;
        self.blocked.clear();
        self.blocked.resize(width * height, false);

        if width == 0 || height == 0 {
            log::debug!("Grid rebuilt empty ({world_width}x{world_height}, cell {cell_size})");
            return;
        }

        let max_x = width as i64 - 1;
        let max_y = height as i64 - 1;

        for obstacle in obstacles {
            let min_cx = ((obstacle.left() / cell_size).floor() as i64).max(0);
            let min_cy = ((obstacle.top() / cell_size).floor() as i64).max(0);
            let max_cx = ((obstacle.right() / cell_size).floor() as i64).min(max_x);
            let max_cy = ((obstacle.bottom() / cell_size).floor() as i64).min(max_y);

            for y in min_cy..=max_cy {
                for x in min_cx..=max_cx {
                    self.blocked[y as usize * width + x as usize] = true;
                }
            }
        }

        log::debug!(
            "Grid rebuilt: {}x{} cells of {}, {} blocked by {} obstacles",
            width,
            height,
            cell_size,
            self.blocked_count(),
            obstacles.len()
        );
    }

    /// Width in cells
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell size in world units
    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// World extent covered by the grid
    #[must_use]
    pub fn world_size(&self) -> Vec2 {
        Vec2::new(
            self.width as f32 * self.cell_size,
            self.height as f32 * self.cell_size,
        )
    }

    /// Number of blocked cells
    #[must_use]
    pub fn blocked_count(&self) -> usize {
        self.blocked.iter().filter(|&&b| b).count()
    }

    /// Convert world position to grid coordinates (floor division).
    ///
    /// The result may lie outside the grid.
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec2) -> IVec2 {
        if self.cell_size <= 0.0 {
            return IVec2::new(-1, -1);
        }
        IVec2::new(
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    /// Convert grid coordinates to world position (center of cell)
    #[must_use]
    pub fn grid_to_world(&self, cell: IVec2) -> Vec2 {
        let half = self.cell_size * 0.5;
        Vec2::new(
            cell.x as f32 * self.cell_size + half,
            cell.y as f32 * self.cell_size + half,
        )
    }

    /// Check if a cell lies inside the grid
    #[must_use]
    pub fn in_bounds(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as usize) < self.width && (cell.y as usize) < self.height
    }

    /// Check if a cell is inside the grid and not blocked
    #[must_use]
    pub fn is_cell_walkable(&self, cell: IVec2) -> bool {
        self.in_bounds(cell) && !self.blocked[cell.y as usize * self.width + cell.x as usize]
    }

    /// Check if the cell containing a world position is walkable
    #[must_use]
    pub fn is_walkable(&self, pos: Vec2) -> bool {
        self.is_cell_walkable(self.world_to_grid(pos))
    }

    /// Walkable Moore neighbors of the cell containing `pos`, as cell centers.
    ///
    /// Diagonal steps are offered even when both orthogonal cells they pass
    /// between are blocked.
    #[must_use]
    pub fn neighbors(&self, pos: Vec2) -> Neighbors {
        let cell = self.world_to_grid(pos);
        NEIGHBOR_OFFSETS
            .iter()
            .filter_map(|&offset| {
                Some(IVec2::new(
                    cell.x.checked_add(offset.x)?,
                    cell.y.checked_add(offset.y)?,
                ))
            })
            .filter(|&n| self.is_cell_walkable(n))
            .map(|n| self.grid_to_world(n))
            .collect()
    }

    /// Iterate over every walkable cell
    pub fn walkable_cells(&self) -> impl Iterator<Item = IVec2> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width)
                .filter(move |&x| !self.blocked[y * self.width + x])
                .map(move |x| IVec2::new(x as i32, y as i32))
        })
    }
}

impl fmt::Display for GridMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height {
            for x in 0..self.width {
                let c = if self.blocked[y * self.width + x] { '#' } else { '.' };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_dimensions() {
        let grid = GridMap::new(1280.0, 720.0, 20.0, &[]);

        assert_eq!(grid.width(), 64);
        assert_eq!(grid.height(), 36);
        assert_eq!(grid.blocked_count(), 0);
    }

    #[test]
    fn test_obstacle_marks_cells() {
        // Covers x 40..60, y 0..20: right/bottom edges touch cells 3 and 1
        let grid = GridMap::new(100.0, 100.0, 20.0, &[Obstacle::new(40.0, 0.0, 20.0, 20.0)]);

        assert!(!grid.is_cell_walkable(IVec2::new(2, 0)));
        assert!(!grid.is_cell_walkable(IVec2::new(3, 0)));
        assert!(!grid.is_cell_walkable(IVec2::new(2, 1)));
        assert!(grid.is_cell_walkable(IVec2::new(1, 0)));
        assert!(grid.is_cell_walkable(IVec2::new(4, 0)));
        assert_eq!(grid.blocked_count(), 4);
        assert_eq!(grid.walkable_cells().count(), 21);
        assert_eq!(grid.walkable_cells().next(), Some(IVec2::new(0, 0)));
    }

    #[test]
    fn test_obstacle_clipped_to_grid() {
        let grid = GridMap::new(
            100.0,
            100.0,
            20.0,
            &[
                Obstacle::new(-50.0, -50.0, 60.0, 60.0),
                Obstacle::new(500.0, 500.0, 10.0, 10.0),
            ],
        );

        assert!(!grid.is_cell_walkable(IVec2::new(0, 0)));
        assert_eq!(grid.blocked_count(), 1);
    }

    #[test]
    fn test_rebuild_replaces_grid() {
        let mut grid = GridMap::new(100.0, 100.0, 10.0, &[Obstacle::new(0.0, 0.0, 5.0, 5.0)]);
        assert!(!grid.is_walkable(Vec2::new(1.0, 1.0)));

        grid.rebuild(200.0, 50.0, 10.0, &[]);

        assert_eq!(grid.width(), 20);
        assert_eq!(grid.height(), 5);
        assert!(grid.is_walkable(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn test_is_walkable_out_of_range() {
        let grid = GridMap::new(100.0, 100.0, 10.0, &[]);

        assert!(grid.is_walkable(Vec2::new(0.0, 0.0)));
        assert!(grid.is_walkable(Vec2::new(99.9, 99.9)));
        assert!(!grid.is_walkable(Vec2::new(100.0, 50.0)));
        assert!(!grid.is_walkable(Vec2::new(-0.5, 50.0)));
        assert!(!grid.is_walkable(Vec2::new(50.0, -3.0)));
    }

    #[test]
    fn test_world_grid_conversion() {
        let grid = GridMap::new(100.0, 100.0, 20.0, &[]);

        assert_eq!(grid.world_to_grid(Vec2::new(45.0, 19.9)), IVec2::new(2, 0));
        assert_eq!(grid.grid_to_world(IVec2::new(2, 0)), Vec2::new(50.0, 10.0));

        // Snaps to the cell center and is idempotent from there on
        let p = Vec2::new(41.0, 33.0);
        let snapped = grid.grid_to_world(grid.world_to_grid(p));
        assert_eq!(snapped, Vec2::new(50.0, 30.0));
        assert_eq!(grid.grid_to_world(grid.world_to_grid(snapped)), snapped);
    }

    #[test]
    fn test_neighbors_open_field() {
        let grid = GridMap::new(100.0, 100.0, 10.0, &[]);

        let neighbors = grid.neighbors(Vec2::new(55.0, 55.0));
        assert_eq!(neighbors.len(), 8);
        assert!(neighbors.contains(&Vec2::new(45.0, 45.0)));
        assert!(neighbors.contains(&Vec2::new(65.0, 55.0)));
        assert!(!neighbors.contains(&Vec2::new(55.0, 55.0)));
    }

    #[test]
    fn test_neighbors_corner_and_blocked() {
        let grid = GridMap::new(100.0, 100.0, 10.0, &[Obstacle::new(12.0, 2.0, 5.0, 5.0)]);

        // Cell (0,0) has only 3 in-range neighbors, one of which (1,0) is blocked
        let neighbors = grid.neighbors(Vec2::new(5.0, 5.0));
        assert_eq!(neighbors.len(), 2);
        assert!(!neighbors.contains(&Vec2::new(15.0, 5.0)));
    }

    #[test]
    fn test_neighbors_allow_diagonal_corner_cutting() {
        // (1,0) and (0,1) blocked; the diagonal (1,1) from (0,0) is still offered
        let grid = GridMap::new(
            30.0,
            30.0,
            10.0,
            &[Obstacle::new(12.0, 2.0, 5.0, 5.0), Obstacle::new(2.0, 12.0, 5.0, 5.0)],
        );

        let neighbors = grid.neighbors(Vec2::new(5.0, 5.0));
        assert_eq!(neighbors.as_slice(), &[Vec2::new(15.0, 15.0)]);
    }

    #[test]
    fn test_oversized_grid_is_empty() {
        let grid = GridMap::new(1e30, 1e30, 1.0, &[Obstacle::new(0.0, 0.0, 5.0, 5.0)]);

        assert_eq!(grid.width(), 0);
        assert_eq!(grid.height(), 0);
        assert!(!grid.is_walkable(Vec2::new(0.5, 0.5)));

        let grid = GridMap::new(100_000.0, 100_000.0, 1.0, &[]);
        assert_eq!(grid.width(), 0);
    }

    #[test]
    fn test_neighbors_far_out_of_range() {
        let grid = GridMap::new(100.0, 100.0, 10.0, &[]);

        assert!(grid.neighbors(Vec2::new(1e12, 5.0)).is_empty());
        assert!(grid.neighbors(Vec2::new(-1e12, -1e12)).is_empty());
        assert!(grid.neighbors(Vec2::new(5.0, 1e12)).is_empty());
    }

    #[test]
    fn test_zero_cell_size_is_empty() {
        let grid = GridMap::new(100.0, 100.0, 0.0, &[]);

        assert_eq!(grid.width(), 0);
        assert!(!grid.is_walkable(Vec2::new(5.0, 5.0)));
        assert!(grid.neighbors(Vec2::new(5.0, 5.0)).is_empty());
    }

    #[test]
    fn test_display_marks_blocked() {
        let grid = GridMap::new(30.0, 20.0, 10.0, &[Obstacle::new(12.0, 2.0, 5.0, 5.0)]);

        assert_eq!(grid.to_string(), ".#.\n...\n");
    }
}
