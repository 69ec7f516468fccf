//! A* pathfinding on a 2D grid
//!
//! 8-connected search over [`GridMap`] cells. Step cost is the Euclidean
//! distance between cell centers and the heuristic is the Euclidean distance
//! to the goal cell center, so returned paths are cost-optimal over the cell
//! graph.
//!
//! The open set is a plain vector scanned linearly on every pop (O(n) per pop,
//! O(n²) overall). That is fine for maps of a few thousand cells.

use glam::{IVec2, Vec2};
use rustc_hash::{FxHashMap, FxHashSet};

use super::grid::GridMap;

/// Result of pathfinding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathResult {
    /// Waypoints in world coordinates, start to goal inclusive
    pub waypoints: Vec<Vec2>,
    /// Total path length
    pub length: f32,
}

impl PathResult {
    fn from_waypoints(waypoints: Vec<Vec2>) -> Self {
        let length = calculate_path_length(&waypoints);
        Self { waypoints, length }
    }

    /// Check if no path was found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Number of waypoints
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }
}

/// A* search node, owned by a single search's arena.
#[derive(Debug, Clone)]
struct SearchNode {
    position: Vec2,
    g_cost: f32, // Cost from start
    h_cost: f32, // Estimate to goal
    parent: Option<usize>,
    in_open: bool,
}

impl SearchNode {
    fn f_cost(&self) -> f32 {
        self.g_cost + self.h_cost
    }
}

/// Per-call search state. Cells are the node identity everywhere.
#[derive(Default)]
struct Search {
    arena: Vec<SearchNode>,
    registry: FxHashMap<IVec2, usize>,
    open: Vec<usize>,
    closed: FxHashSet<IVec2>,
}

impl Search {
    /// Remove and return the open node with minimum f, ties broken by minimum h.
    /// The first candidate in insertion order wins exact ties.
    fn pop_best(&mut self) -> Option<usize> {
        let mut best_slot = 0;
        let mut best = *self.open.first()?;

        for (slot, &index) in self.open.iter().enumerate().skip(1) {
            let node = &self.arena[index];
            let current = &self.arena[best];
            if node.f_cost() < current.f_cost()
                || (node.f_cost() == current.f_cost() && node.h_cost < current.h_cost)
            {
                best = index;
                best_slot = slot;
            }
        }

        self.open.remove(best_slot);
        self.arena[best].in_open = false;
        Some(best)
    }

    fn reconstruct(&self, mut index: usize) -> Vec<Vec2> {
        let mut path = vec![self.arena[index].position];
        while let Some(parent) = self.arena[index].parent {
            path.push(self.arena[parent].position);
            index = parent;
        }
        path.reverse();
        path
    }
}

/// A* pathfinder bound to a read-only grid.
///
/// Holds no state between calls.
#[derive(Debug, Clone, Copy)]
pub struct Pathfinder<'a> {
    grid: &'a GridMap,
}

impl<'a> Pathfinder<'a> {
    /// Create a pathfinder over `grid`
    #[must_use]
    pub fn new(grid: &'a GridMap) -> Self {
        Self { grid }
    }

    /// Find a path from `start` to `end`.
    ///
    /// If both points share a cell the result is `[start, end]` without any
    /// search. Otherwise waypoints are cell centers; an empty result means no
    /// path exists or an endpoint is blocked.
    #[must_use]
    pub fn find_path(&self, start: Vec2, end: Vec2) -> PathResult {
        let grid = self.grid;
        let start_cell = grid.world_to_grid(start);
        let goal_cell = grid.world_to_grid(end);

        if start_cell == goal_cell {
            return PathResult::from_waypoints(vec![start, end]);
        }

        if !grid.is_cell_walkable(start_cell) || !grid.is_cell_walkable(goal_cell) {
            log::trace!("Path {start} -> {end}: endpoint blocked");
            return PathResult::default();
        }

        let goal_center = grid.grid_to_world(goal_cell);
        let start_center = grid.grid_to_world(start_cell);

        let mut search = Search::default();
        search.arena.push(SearchNode {
            position: start_center,
            g_cost: 0.0,
            h_cost: start_center.distance(goal_center),
            parent: None,
            in_open: true,
        });
        search.registry.insert(start_cell, 0);
        search.open.push(0);

        let mut expanded = 0usize;

        while let Some(current) = search.pop_best() {
            let current_pos = search.arena[current].position;
            let current_cell = grid.world_to_grid(current_pos);
            search.closed.insert(current_cell);

            if current_cell == goal_cell {
                let waypoints = search.reconstruct(current);
                log::debug!(
                    "Path {start} -> {end}: {} waypoints, {expanded} nodes expanded",
                    waypoints.len()
                );
                return PathResult::from_waypoints(waypoints);
            }
            expanded += 1;

            let current_g = search.arena[current].g_cost;

            for neighbor_pos in grid.neighbors(current_pos) {
                let neighbor_cell = grid.world_to_grid(neighbor_pos);
                if search.closed.contains(&neighbor_cell) {
                    continue;
                }

                let tentative_g = current_g + current_pos.distance(neighbor_pos);

                let index = match search.registry.get(&neighbor_cell) {
                    Some(&index) => {
                        if tentative_g >= search.arena[index].g_cost {
                            continue;
                        }
                        index
                    }
                    None => {
                        let index = search.arena.len();
                        search.arena.push(SearchNode {
                            position: neighbor_pos,
                            g_cost: f32::INFINITY,
                            h_cost: 0.0,
                            parent: None,
                            in_open: false,
                        });
                        search.registry.insert(neighbor_cell, index);
                        index
                    }
                };

                let node = &mut search.arena[index];
                node.parent = Some(current);
                node.g_cost = tentative_g;
                node.h_cost = neighbor_pos.distance(goal_center);

                if !node.in_open {
                    node.in_open = true;
                    search.open.push(index);
                }
            }
        }

        log::debug!("Path {start} -> {end}: none, {expanded} nodes expanded");
        PathResult::default()
    }
}

/// Find a path using A* algorithm
#[must_use]
pub fn find_path(grid: &GridMap, start: Vec2, goal: Vec2) -> PathResult {
    Pathfinder::new(grid).find_path(start, goal)
}

/// Calculate total path length
fn calculate_path_length(waypoints: &[Vec2]) -> f32 {
    waypoints.windows(2).map(|w| w[0].distance(w[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Obstacle;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const SQRT_2: f32 = std::f32::consts::SQRT_2;

    /// Grid with the given cells blocked (cell size 1.0)
    fn grid_with_blocked(width: usize, height: usize, blocked: &[(i32, i32)]) -> GridMap {
        let obstacles: Vec<Obstacle> = blocked
            .iter()
            .map(|&(x, y)| Obstacle::new(x as f32 + 0.25, y as f32 + 0.25, 0.5, 0.5))
            .collect();
        GridMap::new(width as f32, height as f32, 1.0, &obstacles)
    }

    /// Brute-force Dijkstra over the same 8-connected cell graph
    fn dijkstra(grid: &GridMap, start: IVec2, goal: IVec2) -> Option<f32> {
        let mut dist: FxHashMap<IVec2, f32> = FxHashMap::default();
        let mut done: FxHashSet<IVec2> = FxHashSet::default();
        dist.insert(start, 0.0);

        loop {
            let (&cell, &d) = dist
                .iter()
                .filter(|(c, _)| !done.contains(*c))
                .min_by(|a, b| a.1.partial_cmp(b.1).unwrap())?;
            if cell == goal {
                return Some(d);
            }
            done.insert(cell);

            let center = grid.grid_to_world(cell);
            for n in grid.neighbors(center) {
                let n_cell = grid.world_to_grid(n);
                let nd = d + center.distance(n);
                if nd < *dist.get(&n_cell).unwrap_or(&f32::INFINITY) {
                    dist.insert(n_cell, nd);
                }
            }
        }
    }

    #[test]
    fn test_grid_pathfinding() {
        // A wall at x = 5, y 2..8
        let blocked: Vec<(i32, i32)> = (2..8).map(|y| (5, y)).collect();
        let grid = grid_with_blocked(10, 10, &blocked);

        let path = find_path(&grid, Vec2::new(2.5, 5.5), Vec2::new(8.5, 5.5));

        assert!(!path.is_empty());
        assert!(path.waypoints.len() > 2);
        assert_eq!(path.waypoints[0], Vec2::new(2.5, 5.5));
        assert_eq!(*path.waypoints.last().unwrap(), Vec2::new(8.5, 5.5));
        for waypoint in &path.waypoints {
            assert!(grid.is_walkable(*waypoint));
        }
    }

    #[test]
    fn test_direct_path() {
        let grid = GridMap::new(10.0, 10.0, 1.0, &[]);

        let path = find_path(&grid, Vec2::new(0.5, 0.5), Vec2::new(3.5, 0.5));

        assert_eq!(path.waypoints.len(), 4); // 4 cells in a line
        assert!((path.length - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_diagonal_path() {
        let grid = GridMap::new(10.0, 10.0, 1.0, &[]);

        let path = find_path(&grid, Vec2::new(0.5, 0.5), Vec2::new(4.5, 4.5));

        assert_eq!(path.waypoints.len(), 5);
        assert!((path.length - 4.0 * SQRT_2).abs() < 1e-4);
    }

    #[test]
    fn test_waypoints_are_cell_centers() {
        let grid = GridMap::new(100.0, 100.0, 20.0, &[]);

        let path = find_path(&grid, Vec2::new(3.0, 7.0), Vec2::new(95.0, 12.0));

        assert_eq!(path.waypoints[0], Vec2::new(10.0, 10.0));
        assert_eq!(*path.waypoints.last().unwrap(), Vec2::new(90.0, 10.0));
    }

    #[test]
    fn test_same_cell_shortcut() {
        let grid = GridMap::new(100.0, 100.0, 20.0, &[]);
        let p = Vec2::new(21.0, 22.0);
        let q = Vec2::new(38.0, 39.0);

        let path = find_path(&grid, p, q);

        assert_eq!(path.waypoints, vec![p, q]);
        assert!((path.length - p.distance(q)).abs() < 1e-5);
    }

    #[test]
    fn test_same_cell_shortcut_skips_walkability() {
        let grid = grid_with_blocked(5, 5, &[(2, 2)]);
        let p = Vec2::new(2.1, 2.1);
        let q = Vec2::new(2.9, 2.9);

        assert_eq!(find_path(&grid, p, q).waypoints, vec![p, q]);
    }

    #[test]
    fn test_no_path() {
        // Goal fully enclosed by blocked cells
        let grid = grid_with_blocked(
            5,
            5,
            &[(2, 2), (3, 2), (4, 2), (2, 3), (4, 3), (2, 4), (3, 4), (4, 4)],
        );

        let path = find_path(&grid, Vec2::new(0.5, 0.5), Vec2::new(3.5, 3.5));

        assert!(path.is_empty());
        assert_eq!(path.length, 0.0);
    }

    #[test]
    fn test_blocked_endpoints() {
        let grid = grid_with_blocked(5, 5, &[(0, 0), (4, 4)]);

        assert!(find_path(&grid, Vec2::new(0.5, 0.5), Vec2::new(2.5, 2.5)).is_empty());
        assert!(find_path(&grid, Vec2::new(2.5, 2.5), Vec2::new(4.5, 4.5)).is_empty());
    }

    #[test]
    fn test_out_of_range_endpoint() {
        let grid = GridMap::new(5.0, 5.0, 1.0, &[]);

        assert!(find_path(&grid, Vec2::new(0.5, 0.5), Vec2::new(-3.0, 2.0)).is_empty());
        assert!(find_path(&grid, Vec2::new(7.0, 0.5), Vec2::new(2.5, 2.5)).is_empty());
    }

    #[test]
    fn test_path_cuts_blocked_corner() {
        // Diagonal corner cutting is allowed by the neighbor rule; the path
        // squeezes between (1,0) and (0,1) instead of going around.
        let grid = grid_with_blocked(3, 3, &[(1, 0), (0, 1)]);

        let path = find_path(&grid, Vec2::new(0.5, 0.5), Vec2::new(1.5, 1.5));

        assert_eq!(path.waypoints, vec![Vec2::new(0.5, 0.5), Vec2::new(1.5, 1.5)]);
    }

    #[test]
    fn test_path_matches_dijkstra_on_random_grids() {
        const SEED: u64 = 0x5eed;
        let mut rng = StdRng::seed_from_u64(SEED);

        for _ in 0..200 {
            let width = rng.gen_range(2..12);
            let height = rng.gen_range(2..12);
            let blocked: Vec<(i32, i32)> = (0..width as i32)
                .flat_map(|x| (0..height as i32).map(move |y| (x, y)))
                .filter(|_| rng.gen_bool(0.3))
                .collect();
            let grid = grid_with_blocked(width, height, &blocked);

            let start = IVec2::new(rng.gen_range(0..width as i32), rng.gen_range(0..height as i32));
            let goal = IVec2::new(rng.gen_range(0..width as i32), rng.gen_range(0..height as i32));
            if start == goal {
                continue;
            }

            let path = find_path(&grid, grid.grid_to_world(start), grid.grid_to_world(goal));
            let expected = if grid.is_cell_walkable(start) && grid.is_cell_walkable(goal) {
                dijkstra(&grid, start, goal)
            } else {
                None
            };

            match expected {
                Some(distance) => {
                    assert!(!path.is_empty(), "missing path {start} -> {goal}\n{grid}");
                    assert!(
                        (path.length - distance).abs() < 1e-3,
                        "path {start} -> {goal} has length {} but shortest is {distance}\n{grid}",
                        path.length
                    );
                    for pair in path.waypoints.windows(2) {
                        let a = grid.world_to_grid(pair[0]);
                        let b = grid.world_to_grid(pair[1]);
                        assert!((a - b).abs().max_element() == 1);
                        assert!(grid.is_cell_walkable(b));
                    }
                }
                None => assert!(path.is_empty(), "unexpected path {start} -> {goal}\n{grid}"),
            }
        }
    }
}
