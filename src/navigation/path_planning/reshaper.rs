//! Turns a planner polyline into a speed-annotated trajectory.
//!
//! Each interior corner is replaced by the two tangent points of a circular
//! arc whose radius is what the robot can follow at the corner speed
//! (`r = v² / a`). The speed is lowered until the arc stays within the lateral
//! deviation bound of the raw corner.

use tracing::{debug, warn};

use crate::common::geometry::{distance, normalized};
use crate::common::Point2D;
use crate::config::ReshaperConfig;
use crate::navigation::trajectory::{merge_close_points, Trajectory};

/// Coincident points and vanishing angles below this are degenerate
const EPSILON: f64 = 1e-3;

/// Speeds imposed on the first and last point of a reshaped trajectory
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EndpointSpeeds {
    pub start: f64,
    pub goal: f64,
}

/// How one interior corner ends up in the reshaped trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
enum Corner {
    Keep { point: Point2D, speed: f64 },
    Cut { entry: Point2D, exit: Point2D, speed: f64 },
}

#[derive(Debug, Clone)]
pub struct PathReshaper {
    config: ReshaperConfig,
}

impl PathReshaper {
    pub fn new(config: ReshaperConfig) -> Self {
        PathReshaper { config }
    }

    pub fn config(&self) -> &ReshaperConfig {
        &self.config
    }

    /// Reshape `raw`, stopping at both ends
    pub fn reshape(&self, raw: &Trajectory, max_acceleration: f64, cruise_speed: f64) -> Trajectory {
        self.reshape_with(raw, max_acceleration, cruise_speed, EndpointSpeeds::default())
    }

    /// Reshape `raw` with explicit speeds at the first and last point
    pub fn reshape_with(
        &self,
        raw: &Trajectory,
        max_acceleration: f64,
        cruise_speed: f64,
        endpoints: EndpointSpeeds,
    ) -> Trajectory {
        let cruise_speed = cruise_speed.abs();
        let (points, _) = merge_close_points(raw.points(), raw.speeds(), self.config.merge_distance);
        let last = points.len() - 1;

        let mut shaped_points = vec![points[0]];
        let mut shaped_speeds = vec![endpoints.start];
        for i in 1..last {
            let previous = shaped_points[shaped_points.len() - 1];
            match self.shape_corner(&previous, &points[i], &points[i + 1], max_acceleration, cruise_speed) {
                Corner::Keep { point, speed } => {
                    shaped_points.push(point);
                    shaped_speeds.push(speed);
                }
                Corner::Cut { entry, exit, speed } => {
                    // a shrunk arc may start exactly on the previous point
                    if distance(&previous, &entry) >= self.config.merge_distance {
                        shaped_points.push(entry);
                        shaped_speeds.push(speed);
                    }
                    shaped_points.push(exit);
                    shaped_speeds.push(speed);
                }
            }
        }
        shaped_points.push(points[last]);
        shaped_speeds.push(endpoints.goal);

        let (points, speeds) =
            merge_close_points(&shaped_points, &shaped_speeds, self.config.merge_distance);
        // lengths match and there are at least two points by construction
        match Trajectory::from_points(points, Some(speeds), None) {
            Ok(trajectory) => trajectory,
            Err(_) => raw.clone(),
        }
    }

    /// Smooth the corner at `p2` between `p1` and `p3`
    fn shape_corner(
        &self,
        p1: &Point2D,
        p2: &Point2D,
        p3: &Point2D,
        max_acceleration: f64,
        cruise_speed: f64,
    ) -> Corner {
        if distance(p1, p2) < EPSILON || distance(p2, p3) < EPSILON || distance(p1, p3) < EPSILON {
            return Corner::Keep {
                point: *p2,
                speed: cruise_speed,
            };
        }

        let theta = ((p3.y - p2.y).atan2(p3.x - p2.x) - (p1.y - p2.y).atan2(p1.x - p2.x)).abs();
        let half_sin = (theta / 2.0).sin();

        let mut speed = cruise_speed;
        let mut radius = turning_radius(speed, max_acceleration);
        let mut deviation = corner_deviation(radius, half_sin);
        let mut reductions = 0;
        while deviation > self.config.max_deviation {
            if reductions >= self.config.max_speed_reductions {
                warn!(deviation, "corner deviation still above bound after speed reductions");
                break;
            }
            speed *= self.config.speed_reduction_factor;
            radius = turning_radius(speed, max_acceleration);
            deviation = corner_deviation(radius, half_sin);
            reductions += 1;
        }

        let to_p1 = normalized(&(p1 - p2));
        let to_p3 = normalized(&(p3 - p2));
        let mut tangent = tangent_length(radius, deviation);
        let mut entry = p2 + to_p1 * tangent;
        let mut exit = p2 + to_p3 * tangent;

        if distance(&entry, &exit) > distance(p3, p1) {
            debug!("corner arc larger than the corner, keeping the vertex");
            return Corner::Keep {
                point: *p2,
                speed: cruise_speed,
            };
        }

        let shorter_side = distance(p1, p2).min(distance(p3, p2));
        if shorter_side < tangent {
            // the arc does not fit on the shorter segment: shrink it so the
            // tangent point lands on that segment's far end
            radius *= shorter_side / tangent;
            deviation = corner_deviation(radius, half_sin);
            tangent = tangent_length(radius, deviation);
            entry = p2 + to_p1 * tangent;
            exit = p2 + to_p3 * tangent;
            speed = speed.min(speed_for_radius(radius, max_acceleration));
        }

        if distance(&entry, &exit) < self.config.merge_distance {
            return Corner::Keep { point: *p2, speed };
        }
        Corner::Cut { entry, exit, speed }
    }
}

/// Radius the robot can follow at `speed` under `max_acceleration`
fn turning_radius(speed: f64, max_acceleration: f64) -> f64 {
    if max_acceleration > 0.0 {
        speed * speed / max_acceleration
    } else {
        0.0
    }
}

fn speed_for_radius(radius: f64, max_acceleration: f64) -> f64 {
    (radius * max_acceleration.max(0.0)).sqrt()
}

/// Distance between the corner vertex and an arc of `radius` tangent to both sides
fn corner_deviation(radius: f64, half_sin: f64) -> f64 {
    if half_sin.abs() < EPSILON {
        0.0
    } else {
        radius / half_sin - radius
    }
}

/// Distance from the vertex to the points where the arc meets each side
fn tangent_length(radius: f64, deviation: f64) -> f64 {
    ((deviation + radius).powi(2) - radius * radius).max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2D {
        Point2D::new(x, y)
    }

    fn reshaper() -> PathReshaper {
        PathReshaper::new(ReshaperConfig::default())
    }

    #[test]
    fn test_two_points_stop_at_both_ends() {
        let raw = Trajectory::new(p(0.0, 0.0), p(1000.0, 0.0));
        let shaped = reshaper().reshape(&raw, 2000.0, 1000.0);
        assert_eq!(shaped.points(), raw.points());
        assert_eq!(shaped.speeds(), &[0.0, 0.0]);
    }

    #[test]
    fn test_endpoint_speeds_override() {
        let raw = Trajectory::new(p(0.0, 0.0), p(1000.0, 0.0));
        let shaped = reshaper().reshape_with(
            &raw,
            2000.0,
            1000.0,
            EndpointSpeeds {
                start: 0.0,
                goal: 1000.0,
            },
        );
        assert_eq!(shaped.speeds(), &[0.0, 1000.0]);
    }

    #[test]
    fn test_right_angle_corner_is_cut_at_reduced_speed() {
        let raw = Trajectory::from_points(
            vec![p(0.0, 0.0), p(1000.0, 0.0), p(1000.0, 1000.0)],
            None,
            None,
        )
        .unwrap();
        let shaped = reshaper().reshape(&raw, 2000.0, 1000.0);

        // 1000 mm/s gives a 207 mm deviation, 400 mm/s gives 33 mm
        assert_eq!(shaped.len(), 4);
        assert!((shaped.points()[1] - p(920.0, 0.0)).norm() < 1e-6);
        assert!((shaped.points()[2] - p(1000.0, 80.0)).norm() < 1e-6);
        assert!((shaped.speeds()[1] - 400.0).abs() < 1e-9);
        assert_eq!(shaped.speeds()[0], 0.0);
        assert_eq!(shaped.speeds()[3], 0.0);
    }

    #[test]
    fn test_collinear_vertex_kept_at_cruise_speed() {
        let raw = Trajectory::from_points(
            vec![p(0.0, 0.0), p(500.0, 0.0), p(1000.0, 0.0)],
            None,
            None,
        )
        .unwrap();
        let shaped = reshaper().reshape(&raw, 2000.0, 1000.0);
        assert_eq!(shaped.points(), raw.points());
        assert_eq!(shaped.speeds(), &[0.0, 1000.0, 0.0]);
    }

    #[test]
    fn test_short_corner_shrinks_radius() {
        // first side is only 40 mm long, shorter than the 80 mm tangent length
        let raw = Trajectory::from_points(
            vec![p(960.0, 0.0), p(1000.0, 0.0), p(1000.0, 1000.0)],
            None,
            None,
        )
        .unwrap();
        let shaped = reshaper().reshape(&raw, 2000.0, 1000.0);

        // the entry point lands on the start, which absorbs it
        assert_eq!(shaped.len(), 3);
        assert_eq!(shaped.points()[0], p(960.0, 0.0));
        let exit = shaped.points()[1];
        assert!((exit - p(1000.0, 40.0)).norm() < 1e-6);
        // r = 40 mm → sqrt(40 * 2000)
        assert!((shaped.speeds()[1] - (40.0_f64 * 2000.0).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_close_points_are_merged() {
        let raw = Trajectory::from_points(
            vec![p(0.0, 0.0), p(500.0, 0.0), p(505.0, 0.0), p(1000.0, 0.0)],
            None,
            None,
        )
        .unwrap();
        let shaped = reshaper().reshape(&raw, 2000.0, 1000.0);
        assert_eq!(shaped.points(), &[p(0.0, 0.0), p(505.0, 0.0), p(1000.0, 0.0)]);
    }

    #[test]
    fn test_degenerate_corner_keeps_vertex() {
        let raw = Trajectory::from_points(
            vec![p(0.0, 0.0), p(500.0, 0.0), p(0.0, 0.0), p(0.0, 500.0)],
            None,
            None,
        )
        .unwrap();
        let shaped = reshaper().reshape(&raw, 2000.0, 1000.0);
        assert_eq!(shaped.start(), p(0.0, 0.0));
        assert_eq!(shaped.goal(), p(0.0, 500.0));
        assert!(shaped.points().contains(&p(500.0, 0.0)));
    }
}
