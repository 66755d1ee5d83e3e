//! Path planning module

use crate::common::Point2D;
use crate::navigation::trajectory::Trajectory;
use crate::perception::ObstacleSnapshot;

/// What a planner may look at during one planning call
#[derive(Debug, Clone, Copy)]
pub struct PlanningContext<'a> {
    /// Obstacles frozen at the start of the call
    pub obstacles: &'a ObstacleSnapshot,
    /// Current field-frame velocity of the planning robot (mm/s)
    pub velocity: Point2D,
}

impl<'a> PlanningContext<'a> {
    pub fn new(obstacles: &'a ObstacleSnapshot, velocity: Point2D) -> Self {
        PlanningContext {
            obstacles,
            velocity,
        }
    }

    pub fn obstacle_positions(&self) -> &'a [Point2D] {
        self.obstacles.positions()
    }
}

/// Trait for path planning algorithms
pub trait PathPlanner: Send + Sync {
    /// Plan a path from start to goal.
    ///
    /// Planners always return a usable trajectory; a path that still collides
    /// is a valid best-effort answer.
    fn plan_path(&self, start: Point2D, goal: Point2D, context: &PlanningContext<'_>) -> Trajectory;

    /// Clearance the planner keeps from obstacles (mm)
    fn proxy_gap(&self) -> f64;

    /// Get the name of this planner
    fn name(&self) -> &str;
}

/// A planner that ignores obstacles and drives straight to the goal
#[derive(Debug, Clone)]
pub struct StraightLinePlanner {
    proxy_gap: f64,
}

impl StraightLinePlanner {
    pub fn new(proxy_gap: f64) -> Self {
        StraightLinePlanner { proxy_gap }
    }
}

impl PathPlanner for StraightLinePlanner {
    fn plan_path(&self, start: Point2D, goal: Point2D, _context: &PlanningContext<'_>) -> Trajectory {
        Trajectory::new(start, goal)
    }

    fn proxy_gap(&self) -> f64 {
        self.proxy_gap
    }

    fn name(&self) -> &str {
        "StraightLinePlanner"
    }
}
