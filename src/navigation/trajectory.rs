//! Trajectory representation: waypoints with a target speed at each of them

use crate::common::geometry::distance;
use crate::common::Point2D;
use crate::error::{NavError, Result};

/// Ordered waypoints from `start` to `goal` with the speed (mm/s) the robot
/// should have when it reaches each of them.
///
/// Invariants: at least two points, `points[0] == start`,
/// `points[last] == goal`, and exactly one speed per point.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    start: Point2D,
    goal: Point2D,
    points: Vec<Point2D>,
    speeds: Vec<f64>,
}

impl Trajectory {
    /// Straight two-point trajectory, stopping at both ends
    pub fn new(start: Point2D, goal: Point2D) -> Self {
        Trajectory {
            start,
            goal,
            points: vec![start, goal],
            speeds: vec![0.0, 0.0],
        }
    }

    /// Build a trajectory from a list of points.
    ///
    /// Speeds default to zero everywhere. When `merge_threshold` is given and
    /// the first two of at least three points are closer than it, the second
    /// point and its speed are dropped so no near-zero leading segment remains.
    pub fn from_points(
        mut points: Vec<Point2D>,
        speeds: Option<Vec<f64>>,
        merge_threshold: Option<f64>,
    ) -> Result<Self> {
        if points.len() < 2 {
            return Err(NavError::invalid(format!(
                "a trajectory needs at least 2 points, got {}",
                points.len()
            )));
        }
        let mut speeds = speeds.unwrap_or_else(|| vec![0.0; points.len()]);
        if speeds.len() != points.len() {
            return Err(NavError::invalid(format!(
                "{} speeds given for {} points",
                speeds.len(),
                points.len()
            )));
        }

        if let Some(threshold) = merge_threshold {
            if points.len() > 2 && distance(&points[0], &points[1]) < threshold {
                points.remove(1);
                speeds.remove(1);
            }
        }

        Ok(Trajectory {
            start: points[0],
            goal: points[points.len() - 1],
            points,
            speeds,
        })
    }

    pub fn start(&self) -> Point2D {
        self.start
    }

    pub fn goal(&self) -> Point2D {
        self.goal
    }

    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    pub fn speeds(&self) -> &[f64] {
        &self.speeds
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Next waypoint to reach and the speed expected there
    pub fn next_waypoint(&self) -> (Point2D, f64) {
        (self.points[1], self.speeds[1])
    }

    /// Sum of the segment lengths
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| distance(&w[0], &w[1]))
            .sum()
    }

    /// Iterate over consecutive point pairs
    pub fn segments(&self) -> impl Iterator<Item = (&Point2D, &Point2D)> {
        self.points.windows(2).map(|w| (&w[0], &w[1]))
    }

    /// Concatenate `other` after `self`, dropping its duplicated first point
    pub fn join(&self, other: &Trajectory) -> Trajectory {
        let mut points = self.points.clone();
        points.extend_from_slice(&other.points[1..]);
        let mut speeds = self.speeds.clone();
        speeds.extend_from_slice(&other.speeds[1..]);
        Trajectory {
            start: self.start,
            goal: other.goal,
            points,
            speeds,
        }
    }

    /// Split at point `index` into two trajectories sharing that point.
    ///
    /// An index that would leave one side without a segment yields `None`
    /// for that side and the whole trajectory for the other.
    pub fn split(&self, index: usize) -> (Option<Trajectory>, Option<Trajectory>) {
        if index < 1 {
            return (None, Some(self.clone()));
        }
        if index >= self.points.len() - 1 {
            return (Some(self.clone()), None);
        }
        let first = Trajectory {
            start: self.start,
            goal: self.points[index],
            points: self.points[..=index].to_vec(),
            speeds: self.speeds[..=index].to_vec(),
        };
        let second = Trajectory {
            start: self.points[index],
            goal: self.goal,
            points: self.points[index..].to_vec(),
            speeds: self.speeds[index..].to_vec(),
        };
        (Some(first), Some(second))
    }

    /// Move the first point to `new_start`, dropping the next waypoint when
    /// the robot is already within `merge_threshold` of it
    pub fn rebase_start(&self, new_start: Point2D, merge_threshold: f64) -> Trajectory {
        let mut points = self.points.clone();
        let mut speeds = self.speeds.clone();
        points[0] = new_start;
        if points.len() > 2 && distance(&points[0], &points[1]) < merge_threshold {
            points.remove(1);
            speeds.remove(1);
        }
        Trajectory {
            start: new_start,
            goal: self.goal,
            points,
            speeds,
        }
    }

    /// Drop interior points closer than `threshold` to their successor
    pub fn remove_redundant_points(&self, threshold: f64) -> Trajectory {
        let (points, speeds) = merge_close_points(&self.points, &self.speeds, threshold);
        Trajectory {
            start: self.start,
            goal: self.goal,
            points,
            speeds,
        }
    }
}

/// Keep the endpoints and every interior point that is at least `threshold`
/// away from the point following it in the input
pub(crate) fn merge_close_points(
    points: &[Point2D],
    speeds: &[f64],
    threshold: f64,
) -> (Vec<Point2D>, Vec<f64>) {
    let last = points.len() - 1;
    let mut kept_points = Vec::with_capacity(points.len());
    let mut kept_speeds = Vec::with_capacity(points.len());
    kept_points.push(points[0]);
    kept_speeds.push(speeds[0]);
    for i in 1..last {
        if distance(&points[i], &points[i + 1]) < threshold {
            continue;
        }
        kept_points.push(points[i]);
        kept_speeds.push(speeds[i]);
    }
    kept_points.push(points[last]);
    kept_speeds.push(speeds[last]);
    (kept_points, kept_speeds)
}
