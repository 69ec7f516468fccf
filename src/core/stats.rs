//! Run statistics

use std::collections::VecDeque;
use std::time::Duration;

use rustc_hash::FxHashMap;

use super::events::SimEvent;

/// Tick cost and agent activity tracker
#[derive(Debug)]
pub struct RunStats {
    /// Wall-clock cost of recent ticks
    tick_times: VecDeque<Duration>,
    /// Maximum samples to keep
    max_samples: usize,
    /// Average tick cost in milliseconds
    avg_tick_time_ms: f32,
    /// Minimum tick cost in milliseconds
    min_tick_time_ms: f32,
    /// Maximum tick cost in milliseconds
    max_tick_time_ms: f32,
    /// Total ticks simulated
    total_ticks: u64,
    /// Agent-seconds spent under each state label
    state_time: FxHashMap<&'static str, f32>,
    /// Agent state changes
    state_changes: u64,
    /// Successful path searches
    paths_planned: u64,
    /// Failed path searches
    paths_failed: u64,
    /// Closest any agent came to the target
    closest_approach: f32,
}

impl RunStats {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self {
            tick_times: VecDeque::with_capacity(120),
            max_samples: 120,
            avg_tick_time_ms: 0.0,
            min_tick_time_ms: 0.0,
            max_tick_time_ms: 0.0,
            total_ticks: 0,
            state_time: FxHashMap::default(),
            state_changes: 0,
            paths_planned: 0,
            paths_failed: 0,
            closest_approach: f32::INFINITY,
        }
    }

    /// Record the wall-clock cost of one tick
    pub fn record_tick(&mut self, cost: Duration) {
        self.total_ticks += 1;

        if self.tick_times.len() >= self.max_samples {
            self.tick_times.pop_front();
        }
        self.tick_times.push_back(cost);

        self.update_timing();
    }

    fn update_timing(&mut self) {
        if self.tick_times.is_empty() {
            return;
        }

        let mut total = Duration::ZERO;
        let mut min = Duration::MAX;
        let mut max = Duration::ZERO;

        for &dt in &self.tick_times {
            total += dt;
            min = min.min(dt);
            max = max.max(dt);
        }

        let count = self.tick_times.len() as f32;
        self.avg_tick_time_ms = total.as_secs_f32() / count * 1000.0;
        self.min_tick_time_ms = min.as_secs_f32() * 1000.0;
        self.max_tick_time_ms = max.as_secs_f32() * 1000.0;
    }

    /// Record one agent's tick
    pub fn record_agent(&mut self, label: &'static str, dt: f32, target_distance: f32) {
        *self.state_time.entry(label).or_insert(0.0) += dt;
        self.closest_approach = self.closest_approach.min(target_distance);
    }

    /// Count the events of a tick
    pub fn record_event(&mut self, event: &SimEvent) {
        match event {
            SimEvent::AgentStateChanged { .. } => self.state_changes += 1,
            SimEvent::PathPlanned { .. } => self.paths_planned += 1,
            SimEvent::PathNotFound { .. } => self.paths_failed += 1,
            _ => {}
        }
    }

    /// Total ticks simulated
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Average tick cost in milliseconds
    pub fn avg_tick_time_ms(&self) -> f32 {
        self.avg_tick_time_ms
    }

    /// Minimum tick cost in milliseconds
    pub fn min_tick_time_ms(&self) -> f32 {
        self.min_tick_time_ms
    }

    /// Maximum tick cost in milliseconds
    pub fn max_tick_time_ms(&self) -> f32 {
        self.max_tick_time_ms
    }

    /// Agent-seconds spent under `label`
    pub fn time_in(&self, label: &str) -> f32 {
        self.state_time.get(label).copied().unwrap_or(0.0)
    }

    /// Agent state changes so far
    pub fn state_changes(&self) -> u64 {
        self.state_changes
    }

    /// Successful path searches so far
    pub fn paths_planned(&self) -> u64 {
        self.paths_planned
    }

    /// Failed path searches so far
    pub fn paths_failed(&self) -> u64 {
        self.paths_failed
    }

    /// Closest any agent came to the target, if any agent ticked
    pub fn closest_approach(&self) -> Option<f32> {
        self.closest_approach.is_finite().then_some(self.closest_approach)
    }

    /// Get a formatted stats string
    pub fn format_stats(&self) -> String {
        format!(
            "Ticks: {} | Tick: {:.3}ms (min: {:.3}, max: {:.3}) | Changes: {} | Paths: {} ok, {} failed",
            self.total_ticks,
            self.avg_tick_time_ms,
            self.min_tick_time_ms,
            self.max_tick_time_ms,
            self.state_changes,
            self.paths_planned,
            self.paths_failed
        )
    }

    /// Time per state label, longest first
    pub fn state_breakdown(&self) -> Vec<(&'static str, f32)> {
        let mut breakdown: Vec<_> = self.state_time.iter().map(|(&k, &v)| (k, v)).collect();
        breakdown.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(b.0)));
        breakdown
    }

    /// Forget everything
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_timing() {
        let mut stats = RunStats::new();
        stats.record_tick(Duration::from_millis(2));
        stats.record_tick(Duration::from_millis(4));

        assert_eq!(stats.total_ticks(), 2);
        assert!((stats.avg_tick_time_ms() - 3.0).abs() < 1e-3);
        assert!((stats.min_tick_time_ms() - 2.0).abs() < 1e-3);
        assert!((stats.max_tick_time_ms() - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_default_is_empty() {
        let stats = RunStats::default();

        assert_eq!(stats.total_ticks(), 0);
        assert_eq!(stats.closest_approach(), None);
        assert!(stats.state_breakdown().is_empty());
    }

    #[test]
    fn test_state_breakdown() {
        let mut stats = RunStats::new();
        assert_eq!(stats.closest_approach(), None);

        stats.record_agent("Patrol", 1.0, 300.0);
        stats.record_agent("Chase", 0.5, 80.0);
        stats.record_agent("Patrol", 1.0, 120.0);

        assert_eq!(stats.time_in("Patrol"), 2.0);
        assert_eq!(stats.time_in("Attack"), 0.0);
        assert_eq!(stats.closest_approach(), Some(80.0));
        assert_eq!(stats.state_breakdown(), vec![("Patrol", 2.0), ("Chase", 0.5)]);
    }

    #[test]
    fn test_event_counts() {
        let mut stats = RunStats::new();
        stats.record_event(&SimEvent::PathPlanned {
            waypoints: 2,
            length: 10.0,
        });
        stats.record_event(&SimEvent::AgentStateChanged {
            from: "Patrol",
            to: "Chase",
        });
        stats.record_event(&SimEvent::GridRebuilt {
            width: 1,
            height: 1,
            blocked: 0,
        });

        assert_eq!(stats.paths_planned(), 1);
        assert_eq!(stats.state_changes(), 1);
        assert_eq!(stats.paths_failed(), 0);
        assert!(stats.format_stats().contains("Paths: 1 ok"));
    }
}
