//! Navigation module: planning, reshaping and reuse of robot paths
pub mod collision;
pub mod path_cache;
pub mod path_planning;
pub mod planner;
pub mod trajectory;

use tracing::{debug, info, warn};

use self::collision::is_colliding;
use self::path_cache::{CachedPath, PathCache};
use self::path_planning::reshaper::PathReshaper;
use self::path_planning::RecursivePlanner;
use self::planner::{PathPlanner, PlanningContext};
use self::trajectory::Trajectory;
use crate::common::geometry::distance;
use crate::common::{Pose2D, RobotId};
use crate::config::{CacheConfig, NavConfig};
use crate::error::{NavError, Result};
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, State};
use crate::perception::{RobotState, WorldSnapshot};

/// Navigation stack shared by every friendly robot
pub struct NavigationStack {
    base: LifecycleNodeBase,
    planner: Box<dyn PathPlanner>,
    reshaper: PathReshaper,
    cache: PathCache,
    cache_config: CacheConfig,
}

impl NavigationStack {
    /// Create a navigation stack using the recursive planner
    pub fn new(config: &NavConfig) -> Self {
        Self::with_planner(config, RecursivePlanner::new(config.planner.clone()))
    }

    /// Create a navigation stack with a specific planner
    pub fn with_planner<T: PathPlanner + 'static>(config: &NavConfig, planner: T) -> Self {
        NavigationStack {
            base: LifecycleNodeBase::new("navigation_stack"),
            planner: Box::new(planner),
            reshaper: PathReshaper::new(config.reshaper.clone()),
            cache: PathCache::new(),
            cache_config: config.cache.clone(),
        }
    }

    /// Replace the planner; cached paths from the old one are dropped
    pub fn set_planner<T: PathPlanner + 'static>(&mut self, planner: T) {
        self.planner = Box::new(planner);
        self.cache.clear();
    }

    /// Get the name of the current planner
    pub fn planner_name(&self) -> &str {
        self.planner.name()
    }

    pub fn cache(&self) -> &PathCache {
        &self.cache
    }

    /// Forget the cached path of one robot
    pub fn invalidate(&mut self, robot_id: RobotId) {
        self.cache.invalidate(robot_id);
    }

    /// Path for `robot_id` toward `target`, returned as `(reshaped, raw)`.
    ///
    /// The previous path is reused while the target stays within the goal
    /// tolerance and the path remains clear; otherwise a new one is planned,
    /// reshaped and cached.
    pub fn plan_and_track(
        &mut self,
        robot_id: RobotId,
        target: &Pose2D,
        cruise_speed: f64,
        world: &WorldSnapshot,
    ) -> Result<(Trajectory, Trajectory)> {
        let robot = friendly_robot(world, robot_id)?;
        let position = robot.position();
        let obstacles = world.obstacles_for(robot_id);

        if let Some(reused) = self.cache.try_reuse(
            robot_id,
            position,
            target.position,
            obstacles.positions(),
            &self.cache_config,
            self.planner.proxy_gap(),
        ) {
            self.cache.store(robot_id, reused.clone());
            return Ok((reused.reshaped, reused.raw));
        }

        if distance(&position, &target.position) < self.cache_config.min_path_length {
            debug!(robot_id, "already on target, no planning");
            let trivial = Trajectory::new(position, target.position);
            return Ok((trivial.clone(), trivial));
        }

        let raw = self.plan(robot, target, world)?;
        let reshaped = self
            .reshaper
            .reshape(&raw, robot.limits.max_acceleration, cruise_speed)
            .remove_redundant_points(self.cache_config.redundant_point_threshold);
        debug!(
            robot_id,
            raw_points = raw.len(),
            reshaped_points = reshaped.len(),
            "new path planned"
        );

        self.cache.store(
            robot_id,
            CachedPath {
                raw: raw.clone(),
                reshaped: reshaped.clone(),
            },
        );
        Ok((reshaped, raw))
    }

    /// Plan without reshaping or caching
    pub fn raw_path(&self, robot_id: RobotId, target: &Pose2D, world: &WorldSnapshot) -> Result<Trajectory> {
        let robot = friendly_robot(world, robot_id)?;
        self.plan(robot, target, world)
    }

    fn plan(&self, robot: &RobotState, target: &Pose2D, world: &WorldSnapshot) -> Result<Trajectory> {
        let obstacles = world.obstacles_for(robot.id);
        let context = PlanningContext::new(&obstacles, robot.velocity);
        let raw = self
            .planner
            .plan_path(robot.position(), target.position, &context);
        if is_colliding(&raw, obstacles.positions(), self.planner.proxy_gap()) {
            warn!(
                robot_id = robot.id,
                planner = self.planner.name(),
                "no collision-free path found, using best effort"
            );
        }
        Ok(raw)
    }
}

fn friendly_robot(world: &WorldSnapshot, robot_id: RobotId) -> Result<&RobotState> {
    world
        .friend(robot_id)
        .ok_or_else(|| NavError::invalid(format!("robot {} is not in the world snapshot", robot_id)))
}

impl LifecycleNode for NavigationStack {
    fn on_configure(&mut self) -> Result<()> {
        info!(planner = self.planner.name(), "Configuring navigation stack");
        self.base.transition(State::Inactive)
    }

    fn on_activate(&mut self) -> Result<()> {
        info!("Activating navigation stack");
        self.base.transition(State::Active)
    }

    fn on_deactivate(&mut self) -> Result<()> {
        info!("Deactivating navigation stack");
        self.base.transition(State::Inactive)
    }

    fn on_cleanup(&mut self) -> Result<()> {
        info!(cached = self.cache.len(), "Cleaning up navigation stack");
        self.cache.clear();
        self.base.transition(State::Unconfigured)
    }

    fn state(&self) -> State {
        self.base.get_state()
    }
}
