//! Per-robot path reuse
//!
//! Replanning every tick makes the bypass side flicker as obstacles move a few
//! millimetres. The previous path is kept while the target stays put and the
//! path, advanced to the robot's current position, is still clear with a
//! slightly relaxed clearance.

use std::collections::HashMap;

use tracing::debug;

use crate::common::geometry::distance;
use crate::common::{Point2D, RobotId};
use crate::config::CacheConfig;
use crate::navigation::collision::is_colliding;
use crate::navigation::trajectory::Trajectory;

/// Last planned path of a robot, before and after reshaping
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPath {
    pub raw: Trajectory,
    pub reshaped: Trajectory,
}

#[derive(Debug, Default)]
pub struct PathCache {
    entries: HashMap<RobotId, CachedPath>,
}

impl PathCache {
    pub fn new() -> Self {
        PathCache::default()
    }

    pub fn get(&self, robot_id: RobotId) -> Option<&CachedPath> {
        self.entries.get(&robot_id)
    }

    pub fn store(&mut self, robot_id: RobotId, path: CachedPath) {
        self.entries.insert(robot_id, path);
    }

    pub fn invalidate(&mut self, robot_id: RobotId) {
        self.entries.remove(&robot_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The cached path of `robot_id` advanced to `position`, if it can still
    /// be followed toward `target`
    pub fn try_reuse(
        &self,
        robot_id: RobotId,
        position: Point2D,
        target: Point2D,
        obstacles: &[Point2D],
        config: &CacheConfig,
        proxy_gap: f64,
    ) -> Option<CachedPath> {
        let cached = self.entries.get(&robot_id)?;

        let goal_shift = distance(&cached.raw.goal(), &target);
        if goal_shift > config.goal_tolerance {
            debug!(robot_id, goal_shift, "target moved, replanning");
            return None;
        }

        let raw = cached.raw.rebase_start(position, config.rebase_merge_threshold);
        if is_colliding(&raw, obstacles, proxy_gap - config.reuse_margin) {
            debug!(robot_id, "cached path is now blocked, replanning");
            return None;
        }

        let reshaped = cached
            .reshaped
            .rebase_start(position, config.rebase_merge_threshold)
            .remove_redundant_points(config.redundant_point_threshold);
        debug!(robot_id, points = reshaped.len(), "reusing cached path");
        Some(CachedPath { raw, reshaped })
    }
}
