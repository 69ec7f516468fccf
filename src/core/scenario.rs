//! Scenario configuration
//!
//! A scenario describes the world (size, cell size, obstacles), the pursued
//! target and the tuning of every agent kind. Scenarios are saved and loaded
//! in RON (Rusty Object Notation) or JSON.

use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::ai::MAX_CELLS;
use crate::world::Obstacle;

/// Tuning for the A* agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathAgentConfig {
    /// Travel speed (world units per second)
    pub speed: f32,
    /// Start chasing inside this distance
    pub detection_radius: f32,
    /// Stop and attack inside this distance
    pub attack_radius: f32,
    /// Distance at which a waypoint counts as reached
    pub waypoint_threshold: f32,
    /// Seconds between new patrol targets
    pub patrol_interval: f32,
    /// Seconds between re-plans while chasing
    pub replan_interval: f32,
    /// Attempts at finding a walkable patrol cell
    pub patrol_attempts: usize,
    /// Body radius
    pub radius: f32,
}

impl Default for PathAgentConfig {
    fn default() -> Self {
        Self {
            speed: 150.0,
            detection_radius: 200.0,
            attack_radius: 50.0,
            waypoint_threshold: 15.0,
            patrol_interval: 5.0,
            replan_interval: 0.5,
            patrol_attempts: 10,
            radius: 15.0,
        }
    }
}

/// Tuning for the behavior-tree agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorAgentConfig {
    /// Pursue speed
    pub speed: f32,
    /// Wander speed
    pub wander_speed: f32,
    /// Flee speed as a multiple of `speed`
    pub flee_speed_factor: f32,
    /// Pursue inside this distance
    pub detection_radius: f32,
    /// Attack inside this distance
    pub attack_radius: f32,
    /// Flee at or below this health
    pub low_health: f32,
    /// Health regained per second
    pub health_regen: f32,
    /// Health at spawn, in `0.0..=1.0`
    pub initial_health: f32,
    /// Seconds between wander targets
    pub wander_interval: f32,
    /// Distance at which a wander target counts as reached
    pub wander_arrival: f32,
    /// Closest wander target distance
    pub wander_min_distance: f32,
    /// Farthest wander target distance
    pub wander_max_distance: f32,
    /// Attempts at finding a walkable wander target
    pub wander_attempts: usize,
    /// Wander targets stay this far from the world edge
    pub edge_margin: f32,
    /// Body radius
    pub radius: f32,
}

impl Default for BehaviorAgentConfig {
    fn default() -> Self {
        Self {
            speed: 150.0,
            wander_speed: 80.0,
            flee_speed_factor: 1.2,
            detection_radius: 180.0,
            attack_radius: 50.0,
            low_health: 0.3,
            health_regen: 0.02,
            initial_health: 1.0,
            wander_interval: 3.0,
            wander_arrival: 20.0,
            wander_min_distance: 50.0,
            wander_max_distance: 250.0,
            wander_attempts: 10,
            edge_margin: 50.0,
            radius: 15.0,
        }
    }
}

/// Tuning for the state-machine agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeAgentConfig {
    /// Patrol speed
    pub patrol_speed: f32,
    /// Chase speed
    pub chase_speed: f32,
    /// `PlayerDetected` is raised inside this distance
    pub detection_radius: f32,
    /// `PlayerLost` is raised beyond this distance
    pub lost_radius: f32,
    /// Patrol turns into chase automatically inside this distance
    pub auto_chase_radius: f32,
    /// Seconds spent idle before patrolling
    pub idle_time: f32,
    /// Distance at which a patrol point counts as reached
    pub patrol_arrival: f32,
    /// Closest patrol point distance
    pub patrol_min_distance: f32,
    /// Farthest patrol point distance
    pub patrol_max_distance: f32,
    /// Patrol points stay this far from the world edge
    pub edge_margin: f32,
    /// Body radius
    pub radius: f32,
}

impl Default for ModeAgentConfig {
    fn default() -> Self {
        Self {
            patrol_speed: 50.0,
            chase_speed: 100.0,
            detection_radius: 150.0,
            lost_radius: 250.0,
            auto_chase_radius: 100.0,
            idle_time: 2.0,
            patrol_arrival: 10.0,
            patrol_min_distance: 100.0,
            patrol_max_distance: 300.0,
            edge_margin: 50.0,
            radius: 15.0,
        }
    }
}

/// The pursued target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Starting position; `None` puts it at the world center
    pub start: Option<Vec2>,
    /// Looping route; empty keeps the target still
    pub route: Vec<Vec2>,
    /// Route speed
    pub speed: f32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            start: None,
            route: Vec::new(),
            speed: 100.0,
        }
    }
}

/// A complete simulation scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Scenario name
    pub name: String,
    /// World width in world units
    pub world_width: f32,
    /// World height in world units
    pub world_height: f32,
    /// Grid cell size in world units
    pub cell_size: f32,
    /// Obstacles placed in the world
    pub obstacles: Vec<Obstacle>,
    /// The pursued target
    pub target: TargetConfig,
    /// Fixed agent spawn points, one agent each
    pub agent_spawns: Vec<Vec2>,
    /// Agents spawned at random clear points when `agent_spawns` is empty
    pub agent_count: usize,
    /// Seed for every random choice in the run
    pub seed: u64,
    /// Length of one tick in seconds
    pub tick_seconds: f32,
    /// Ticks to run
    pub ticks: u32,
    /// A* agent tuning
    pub path_agent: PathAgentConfig,
    /// Behavior-tree agent tuning
    pub behavior_agent: BehaviorAgentConfig,
    /// State-machine agent tuning
    pub mode_agent: ModeAgentConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let (width, height) = (1280.0, 720.0);
        Self {
            name: String::from("Arena"),
            world_width: width,
            world_height: height,
            cell_size: 20.0,
            obstacles: default_obstacles(width, height),
            target: TargetConfig::default(),
            agent_spawns: Vec::new(),
            agent_count: 2,
            seed: 42,
            tick_seconds: 1.0 / 60.0,
            ticks: 600,
            path_agent: PathAgentConfig::default(),
            behavior_agent: BehaviorAgentConfig::default(),
            mode_agent: ModeAgentConfig::default(),
        }
    }
}

/// Boundary walls plus a handful of interior blocks
fn default_obstacles(width: f32, height: f32) -> Vec<Obstacle> {
    const WALL: f32 = 20.0;
    vec![
        Obstacle::new(0.0, 0.0, width, WALL),
        Obstacle::new(0.0, height - WALL, width, WALL),
        Obstacle::new(0.0, 0.0, WALL, height),
        Obstacle::new(width - WALL, 0.0, WALL, height),
        Obstacle::new(400.0, 200.0, 100.0, 100.0),
        Obstacle::new(700.0, 400.0, 150.0, 80.0),
        Obstacle::new(300.0, 500.0, 80.0, 120.0),
        Obstacle::new(900.0, 150.0, 120.0, 120.0),
        Obstacle::new(500.0, 350.0, 80.0, 80.0),
    ]
}

impl ScenarioConfig {
    /// Create a named scenario with the default layout
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// An empty world with no obstacles
    #[must_use]
    pub fn empty(width: f32, height: f32, cell_size: f32) -> Self {
        Self {
            name: String::from("Empty"),
            world_width: width,
            world_height: height,
            cell_size,
            obstacles: Vec::new(),
            ..Default::default()
        }
    }

    /// Set the world dimensions
    #[must_use]
    pub fn with_world_size(mut self, width: f32, height: f32) -> Self {
        self.world_width = width;
        self.world_height = height;
        self
    }

    /// Set the grid cell size
    #[must_use]
    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Add an obstacle
    #[must_use]
    pub fn with_obstacle(mut self, obstacle: Obstacle) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    /// Place the target and its route
    #[must_use]
    pub fn with_target(mut self, start: Vec2, route: Vec<Vec2>) -> Self {
        self.target.start = Some(start);
        self.target.route = route;
        self
    }

    /// Add a fixed agent spawn point
    #[must_use]
    pub fn with_agent_spawn(mut self, spawn: Vec2) -> Self {
        self.agent_spawns.push(spawn);
        self
    }

    /// Set how many agents spawn at random points
    #[must_use]
    pub fn with_agent_count(mut self, count: usize) -> Self {
        self.agent_count = count;
        self
    }

    /// Set the random seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the tick length and count
    #[must_use]
    pub fn with_ticks(mut self, tick_seconds: f32, ticks: u32) -> Self {
        self.tick_seconds = tick_seconds;
        self.ticks = ticks;
        self
    }

    /// World extent
    #[must_use]
    pub fn world_size(&self) -> Vec2 {
        Vec2::new(self.world_width, self.world_height)
    }

    /// Where the target starts
    #[must_use]
    pub fn target_start(&self) -> Vec2 {
        self.target.start.unwrap_or(self.world_size() * 0.5)
    }

    /// Reject scenarios no simulation can run
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("world_width", self.world_width),
            ("world_height", self.world_height),
            ("cell_size", self.cell_size),
            ("tick_seconds", self.tick_seconds),
        ];
        for (field, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be positive, got {value}"
                )));
            }
        }

        if self.cell_size > self.world_width.min(self.world_height) {
            return Err(ConfigError::Invalid(format!(
                "cell_size {} does not fit a {}x{} world",
                self.cell_size, self.world_width, self.world_height
            )));
        }

        let cells = (self.world_width / self.cell_size).floor() as f64
            * (self.world_height / self.cell_size).floor() as f64;
        if cells > MAX_CELLS as f64 {
            return Err(ConfigError::Invalid(format!(
                "a {}x{} world with cell_size {} needs {cells} cells, over the {MAX_CELLS} limit",
                self.world_width, self.world_height, self.cell_size
            )));
        }

        if let Some(obstacle) = self
            .obstacles
            .iter()
            .find(|o| o.size.x < 0.0 || o.size.y < 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "obstacle at {} has a negative size",
                obstacle.position
            )));
        }

        Ok(())
    }

    /// Save the scenario to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let ron_string = self.to_ron()?;
        fs::write(path, ron_string).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load a scenario from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_ron(&content)
    }

    /// Save the scenario to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json_string = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        fs::write(path, json_string).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load a scenario from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::DeserializeError(e.to_string()))
    }

    /// Load a scenario, choosing the format from the file extension
    /// (`.json` is JSON, anything else is RON)
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::load_json(path)
        } else {
            Self::load_ron(path)
        }
    }

    /// Serialize to a pretty RON string
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Parse a RON string
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        ron::from_str(source).map_err(|e| ConfigError::DeserializeError(e.to_string()))
    }
}

/// Errors that can occur while loading, saving or validating a scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// IO error
    IoError(String),
    /// Serialization error
    SerializeError(String),
    /// Deserialization error
    DeserializeError(String),
    /// The scenario cannot be simulated
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::SerializeError(e) => write!(f, "Serialization error: {e}"),
            Self::DeserializeError(e) => write!(f, "Deserialization error: {e}"),
            Self::Invalid(e) => write!(f, "Invalid scenario: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
