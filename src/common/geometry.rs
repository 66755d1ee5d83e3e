//! Planar geometry helpers shared by the planner, reshaper and controller

use std::f64::consts::PI;

use nalgebra::Rotation2;

use super::types::Point2D;

/// Euclidean distance between two points
pub fn distance(a: &Point2D, b: &Point2D) -> f64 {
    (b - a).norm()
}

/// Angle of the vector going from `a` to `b`
pub fn angle(a: &Point2D, b: &Point2D) -> f64 {
    let d = b - a;
    d.y.atan2(d.x)
}

/// Unit vector in the direction of `v`, or the zero vector when `v` has no length
pub fn normalized(v: &Point2D) -> Point2D {
    let norm = v.norm();
    if norm > 0.0 {
        v / norm
    } else {
        Point2D::zeros()
    }
}

/// Wrap an angle into (-pi, pi]
pub fn wrap_to_pi(angle: f64) -> f64 {
    let mut wrapped = angle % (2.0 * PI);
    if wrapped > PI {
        wrapped -= 2.0 * PI;
    } else if wrapped <= -PI {
        wrapped += 2.0 * PI;
    }
    wrapped
}

/// Express a robot-frame vector in the field frame
pub fn robot_to_field(v: &Point2D, heading: f64) -> Point2D {
    Rotation2::new(heading) * *v
}

/// Express a field-frame vector in the frame of a robot facing `heading`
pub fn field_to_robot(v: &Point2D, heading: f64) -> Point2D {
    robot_to_field(v, -heading)
}

/// Orthogonal projection of `reference` on the infinite line through `p1` and `p2`
pub fn closest_point_on_line(reference: &Point2D, p1: &Point2D, p2: &Point2D) -> Point2D {
    let direction = p2 - p1;
    let len_sq = direction.norm_squared();
    if len_sq == 0.0 {
        return *p1;
    }
    let t = (reference - p1).dot(&direction) / len_sq;
    p1 + direction * t
}

/// Distance from `point` to the segment `[a, b]`.
///
/// When the projection of `point` falls outside the segment the distance to
/// the nearer endpoint is returned.
pub fn distance_to_segment(point: &Point2D, a: &Point2D, b: &Point2D) -> f64 {
    let direction = b - a;
    let len_sq = direction.norm_squared();
    if len_sq == 0.0 {
        return distance(point, a);
    }
    let t = (point - a).dot(&direction) / len_sq;
    if t <= 0.0 {
        distance(point, a)
    } else if t >= 1.0 {
        distance(point, b)
    } else {
        distance(point, &(a + direction * t))
    }
}

/// Perpendicular distance from `point` to the infinite line through `origin`
/// with unit `direction`
pub fn distance_to_line(point: &Point2D, origin: &Point2D, direction: &Point2D) -> f64 {
    direction.perp(&(point - origin)).abs()
}

/// Index of and distance to the point of `candidates` nearest to `reference`
pub fn nearest(reference: &Point2D, candidates: &[Point2D]) -> Option<(usize, f64)> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, p)| (i, distance(reference, p)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn p(x: f64, y: f64) -> Point2D {
        Point2D::new(x, y)
    }

    fn assert_close(a: &Point2D, b: &Point2D) {
        assert!(distance(a, b) < 1e-6, "{a:?} != {b:?}");
    }

    #[test]
    fn test_distance() {
        assert_eq!(distance(&p(0.0, 0.0), &p(0.0, 10000.0)), 10000.0);
        let expected = (2.0 * 20000.0_f64.powi(2)).sqrt();
        assert!((distance(&p(10000.0, 10000.0), &p(-10000.0, -10000.0)) - expected).abs() < EPS);
    }

    #[test]
    fn test_angle() {
        let origin = p(0.0, 0.0);
        assert!((angle(&origin, &p(0.0, 10000.0)) - PI / 2.0).abs() < EPS);
        assert!((angle(&origin, &p(10000.0, 10000.0)) - PI / 4.0).abs() < EPS);
        assert!((angle(&origin, &p(-10000.0, 10000.0)) - 3.0 * PI / 4.0).abs() < EPS);
        assert!((angle(&origin, &p(10000.0, -10000.0)) + PI / 4.0).abs() < EPS);
        assert!((angle(&origin, &p(-10000.0, -10000.0)) + 3.0 * PI / 4.0).abs() < EPS);
    }

    #[test]
    fn test_nearest() {
        let origin = p(0.0, 0.0);
        let north = p(0.0, 10000.0);
        let candidates = [p(10000.0, 10000.0), p(10000.0, -10000.0), north];
        assert_eq!(nearest(&origin, &candidates).map(|(i, _)| i), Some(2));
        assert_eq!(nearest(&origin, &[]), None);
    }

    #[test]
    fn test_closest_point_on_line() {
        let origin = p(0.0, 0.0);
        assert_close(
            &closest_point_on_line(&p(10000.0, 10000.0), &p(10000.0, -10000.0), &p(-10000.0, 10000.0)),
            &origin,
        );
        assert_close(
            &closest_point_on_line(&p(10000.0, -10000.0), &origin, &p(0.0, 10000.0)),
            &p(0.0, -10000.0),
        );
        assert_close(
            &closest_point_on_line(&p(10000.0, 10000.0), &origin, &p(0.0, 10000.0)),
            &p(0.0, 10000.0),
        );
    }

    #[test]
    fn test_distance_to_segment_clamps_to_endpoints() {
        let a = p(0.0, 0.0);
        let b = p(1000.0, 0.0);
        assert!((distance_to_segment(&p(500.0, 200.0), &a, &b) - 200.0).abs() < EPS);
        assert!((distance_to_segment(&p(-300.0, 400.0), &a, &b) - 500.0).abs() < EPS);
        assert!((distance_to_segment(&p(1300.0, -400.0), &a, &b) - 500.0).abs() < EPS);
    }

    #[test]
    fn test_wrap_to_pi() {
        assert!((wrap_to_pi(3.0 * PI / 2.0) + PI / 2.0).abs() < EPS);
        assert!((wrap_to_pi(-3.0 * PI / 2.0) - PI / 2.0).abs() < EPS);
        assert!((wrap_to_pi(PI) - PI).abs() < EPS);
        assert!((wrap_to_pi(-PI) - PI).abs() < EPS);
    }

    #[test]
    fn test_frame_transforms() {
        let v = p(1000.0, 0.0);
        assert_close(&field_to_robot(&v, PI / 2.0), &p(0.0, -1000.0));
        assert_close(&robot_to_field(&field_to_robot(&v, 0.7), 0.7), &v);
    }

    #[test]
    fn test_normalized_zero_vector() {
        assert_eq!(normalized(&Point2D::zeros()), Point2D::zeros());
        assert_close(&normalized(&p(3.0, 4.0)), &p(0.6, 0.8));
    }
}
