//! Recursive bypass planner
//!
//! The straight line to the goal is checked against the obstacle snapshot.
//! When it is blocked, a bypass point is placed beside the nearest blocking
//! obstacle and both halves (start to bypass, bypass to goal) are planned
//! again, one level deeper. Recursion stops at `max_recursion_depth`, so the
//! result may still collide in a crowded field; that is a normal outcome.

pub mod reshaper;

use tracing::{debug, warn};

use crate::common::geometry::{distance, distance_to_line, normalized};
use crate::common::Point2D;
use crate::config::PlannerConfig;
use crate::navigation::collision::{is_colliding, is_point_blocked};
use crate::navigation::planner::{PathPlanner, PlanningContext};
use crate::navigation::trajectory::Trajectory;

/// Start and goal closer than this (mm) have no usable direction
const MIN_DIRECTION_LENGTH: f64 = 1e-3;

/// Fraction of the resolution added once a bypass point is clear
const OVERSHOOT_RATIO: f64 = 0.01;

/// Side of the travel direction a bypass point is placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvoidSide {
    /// Right-hand side of the travel direction, the default
    Right,
    Left,
}

impl AvoidSide {
    fn sign(self) -> f64 {
        match self {
            AvoidSide::Right => 1.0,
            AvoidSide::Left => -1.0,
        }
    }
}

/// Waypoint inserted to go around an obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bypass {
    pub point: Point2D,
    pub side: AvoidSide,
    /// Obstacle that caused the bypass
    pub obstacle: Point2D,
}

/// Bounded-depth recursive planner
#[derive(Debug, Clone)]
pub struct RecursivePlanner {
    config: PlannerConfig,
}

impl RecursivePlanner {
    pub fn new(config: PlannerConfig) -> Self {
        RecursivePlanner { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Route `trajectory` around the obstacles of `context`.
    ///
    /// `avoid_side` is the side chosen by the parent call; sub-paths keep it
    /// so successive levels do not flip between left and right bypasses.
    pub fn plan(
        &self,
        trajectory: &Trajectory,
        context: &PlanningContext<'_>,
        depth: u32,
        avoid_side: Option<AvoidSide>,
    ) -> Trajectory {
        let obstacles = context.obstacle_positions();
        if depth >= self.config.max_recursion_depth
            || !is_colliding(trajectory, obstacles, self.config.proxy_gap)
        {
            return trajectory.clone();
        }

        let Some(bypass) = self.search_bypass(trajectory, context, avoid_side) else {
            debug!(depth, "blocking obstacle is not beside the path, keeping it");
            return trajectory.clone();
        };
        debug!(
            depth,
            x = bypass.point.x,
            y = bypass.point.y,
            side = ?bypass.side,
            "inserting bypass point"
        );

        let first = self.plan(
            &Trajectory::new(trajectory.start(), bypass.point),
            context,
            depth + 1,
            Some(bypass.side),
        );
        let second = self.plan(
            &Trajectory::new(bypass.point, trajectory.goal()),
            context,
            depth + 1,
            Some(bypass.side),
        );
        first.join(&second)
    }

    /// Nearest obstacle (from the start) that sits within the proxy gap of
    /// the start-goal line and actually collides with the trajectory
    pub fn closest_blocking_obstacle(
        &self,
        trajectory: &Trajectory,
        obstacles: &[Point2D],
    ) -> Option<Point2D> {
        let start = trajectory.start();
        let goal = trajectory.goal();
        if distance(&start, &goal) < MIN_DIRECTION_LENGTH {
            return None;
        }
        let direction = normalized(&(goal - start));

        obstacles
            .iter()
            .filter(|obstacle| {
                distance_to_line(obstacle, &start, &direction) < self.config.proxy_gap
                    && is_colliding(trajectory, std::slice::from_ref(*obstacle), self.config.proxy_gap)
            })
            .min_by(|a, b| distance(&start, a).total_cmp(&distance(&start, b)))
            .copied()
    }

    /// Bypass point for the closest blocking obstacle, `None` when that
    /// obstacle does not project inside the start-goal segment
    pub fn search_bypass(
        &self,
        trajectory: &Trajectory,
        context: &PlanningContext<'_>,
        avoid_side: Option<AvoidSide>,
    ) -> Option<Bypass> {
        let obstacles = context.obstacle_positions();
        let obstacle = self.closest_blocking_obstacle(trajectory, obstacles)?;

        let start = trajectory.start();
        let goal = trajectory.goal();
        let direction = normalized(&(goal - start));
        let along = (obstacle - start).dot(&direction);
        if along <= 0.0 || along >= distance(&start, &goal) {
            return None;
        }

        let projection = start + direction * along;
        let perpendicular = Point2D::new(direction.y, -direction.x);

        let (side, point) = match avoid_side {
            Some(side) => (
                side,
                self.clear_candidate(&projection, &(perpendicular * side.sign()), obstacles),
            ),
            None => {
                let right = self.clear_candidate(&projection, &perpendicular, obstacles);
                let left = self.clear_candidate(&projection, &(-perpendicular), obstacles);
                match self.select_side(&start, &right, &left, &context.velocity) {
                    AvoidSide::Right => (AvoidSide::Right, right),
                    AvoidSide::Left => (AvoidSide::Left, left),
                }
            }
        };

        Some(Bypass {
            point,
            side,
            obstacle,
        })
    }

    /// Push a candidate outward from `projection` until it clears every obstacle
    fn clear_candidate(&self, projection: &Point2D, outward: &Point2D, obstacles: &[Point2D]) -> Point2D {
        let step = outward * self.config.resolution;
        let mut candidate = projection + step;
        let mut steps = 0;
        while is_point_blocked(&candidate, obstacles, self.config.proxy_gap) {
            if steps >= self.config.max_expansion_steps {
                warn!(
                    steps,
                    "bypass point still blocked after the expansion limit, using it anyway"
                );
                break;
            }
            candidate += step;
            steps += 1;
        }
        candidate + step * OVERSHOOT_RATIO
    }

    /// Prefer the candidate lying in the direction the robot already moves;
    /// without a meaningful velocity, go right
    fn select_side(
        &self,
        start: &Point2D,
        right: &Point2D,
        left: &Point2D,
        velocity: &Point2D,
    ) -> AvoidSide {
        if velocity.norm() < self.config.side_selection_min_speed {
            return AvoidSide::Right;
        }
        let heading = normalized(velocity);
        let right_alignment = heading.dot(&normalized(&(right - start)));
        let left_alignment = heading.dot(&normalized(&(left - start)));
        if left_alignment > right_alignment {
            AvoidSide::Left
        } else {
            AvoidSide::Right
        }
    }
}

impl PathPlanner for RecursivePlanner {
    fn plan_path(&self, start: Point2D, goal: Point2D, context: &PlanningContext<'_>) -> Trajectory {
        self.plan(&Trajectory::new(start, goal), context, 0, None)
    }

    fn proxy_gap(&self) -> f64 {
        self.config.proxy_gap
    }

    fn name(&self) -> &str {
        "RecursivePlanner"
    }
}
