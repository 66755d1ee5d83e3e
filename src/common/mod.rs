//! Common utilities and types for the navigation core
pub mod geometry;

/// Common types and utilities used across the codebase
pub mod types {
    use nalgebra::Vector2;

    /// A 2D point on the field plane, in millimetres
    pub type Point2D = Vector2<f64>;

    /// Robot identifier as assigned by the vision system
    pub type RobotId = u8;

    /// A pose on the field: position (mm) and orientation (rad)
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Pose2D {
        pub position: Point2D,
        pub orientation: f64,
    }

    impl Pose2D {
        pub fn new(x: f64, y: f64, orientation: f64) -> Self {
            Pose2D {
                position: Point2D::new(x, y),
                orientation,
            }
        }

        pub fn from_position(position: Point2D, orientation: f64) -> Self {
            Pose2D {
                position,
                orientation,
            }
        }
    }

    impl Default for Pose2D {
        fn default() -> Self {
            Pose2D::new(0.0, 0.0, 0.0)
        }
    }
}

pub use types::{Point2D, Pose2D, RobotId};
