//! Segment/obstacle clearance checks

use crate::common::geometry::distance_to_segment;
use crate::common::Point2D;
use crate::navigation::trajectory::Trajectory;

/// Segments shorter than this (mm) end the check early
const DEGENERATE_SEGMENT: f64 = 1e-5;

/// Whether any segment of `trajectory` passes strictly closer than
/// `tolerance` to one of `obstacles`.
///
/// A zero-length segment ends the whole check with "no collision", even if a
/// later segment would collide. Callers gate on this value; it does not rank
/// collisions.
pub fn is_colliding(trajectory: &Trajectory, obstacles: &[Point2D], tolerance: f64) -> bool {
    for (start, end) in trajectory.segments() {
        if (end - start).norm() < DEGENERATE_SEGMENT {
            return false;
        }
        if obstacles
            .iter()
            .any(|obstacle| distance_to_segment(obstacle, start, end) < tolerance)
        {
            return true;
        }
    }
    false
}

/// Whether `point` is closer than `tolerance` to any obstacle
pub fn is_point_blocked(point: &Point2D, obstacles: &[Point2D], tolerance: f64) -> bool {
    obstacles
        .iter()
        .any(|obstacle| (obstacle - point).norm() < tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2D {
        Point2D::new(x, y)
    }

    #[test]
    fn test_obstacle_near_segment_collides() {
        let trajectory = Trajectory::new(p(0.0, 0.0), p(1000.0, 0.0));
        assert!(is_colliding(&trajectory, &[p(500.0, 100.0)], 150.0));
        assert!(!is_colliding(&trajectory, &[p(500.0, 200.0)], 150.0));
    }

    #[test]
    fn test_obstacle_beyond_endpoint_uses_endpoint_distance() {
        let trajectory = Trajectory::new(p(0.0, 0.0), p(1000.0, 0.0));
        // on the line but 200mm past the goal
        assert!(!is_colliding(&trajectory, &[p(1200.0, 0.0)], 150.0));
        assert!(is_colliding(&trajectory, &[p(1100.0, 0.0)], 150.0));
        assert!(!is_colliding(&trajectory, &[p(-160.0, 0.0)], 150.0));
    }

    #[test]
    fn test_zero_length_segment_is_not_a_collision() {
        let trajectory = Trajectory::new(p(100.0, 100.0), p(100.0, 100.0));
        assert!(!is_colliding(&trajectory, &[p(100.0, 100.0)], 150.0));
    }

    #[test]
    fn test_zero_length_segment_masks_later_segments() {
        let trajectory = Trajectory::from_points(
            vec![p(0.0, 0.0), p(0.0, 0.0), p(1000.0, 0.0)],
            None,
            None,
        )
        .unwrap();
        assert!(!is_colliding(&trajectory, &[p(500.0, 0.0)], 150.0));
    }

    #[test]
    fn test_no_obstacles() {
        let trajectory = Trajectory::new(p(0.0, 0.0), p(1000.0, 0.0));
        assert!(!is_colliding(&trajectory, &[], 150.0));
    }

    #[test]
    fn test_point_blocked() {
        assert!(is_point_blocked(&p(0.0, 0.0), &[p(100.0, 0.0)], 150.0));
        assert!(!is_point_blocked(&p(0.0, 0.0), &[p(150.0, 0.0)], 150.0));
    }
}
