//! Per-robot closed-loop motion control
//!
//! Every tick the controller turns the next waypoint of a trajectory (or a
//! bare goal pose) into a robot-frame velocity command. Far from the waypoint
//! the speed follows a trapezoidal profile toward the waypoint speed; once the
//! robot is inside its braking distance of a stopping waypoint, a positional
//! PID takes over for the fine approach.

use tracing::trace;

use crate::common::geometry::{field_to_robot, normalized, wrap_to_pi};
use crate::common::{Point2D, Pose2D, RobotId};
use crate::config::{ControlSetting, PidSetting};
use crate::control::controllers::Pid;
use crate::error::{NavError, Result};
use crate::navigation::trajectory::Trajectory;
use crate::perception::{DynamicLimits, RobotState};

/// Safety factor applied to the theoretical braking distance
const BRAKING_MARGIN: f64 = 1.5;

/// Robot-frame velocity sent to one robot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityCommand {
    /// mm/s, x forward
    pub translation: Point2D,
    /// rad/s
    pub angular: f64,
}

impl VelocityCommand {
    pub fn new(x: f64, y: f64, angular: f64) -> Self {
        VelocityCommand {
            translation: Point2D::new(x, y),
            angular,
        }
    }

    pub fn zero() -> Self {
        VelocityCommand::new(0.0, 0.0, 0.0)
    }
}

/// What the controller steers toward this tick
#[derive(Debug, Clone, Copy)]
pub enum MotionTarget<'a> {
    /// Follow a trajectory, ending with `orientation`
    Path {
        trajectory: &'a Trajectory,
        orientation: f64,
    },
    /// Go straight to a pose and stop there
    Pose(Pose2D),
}

impl MotionTarget<'_> {
    /// Pose to reach next and the speed expected there
    fn next_target(&self) -> (Pose2D, f64) {
        match self {
            MotionTarget::Path {
                trajectory,
                orientation,
            } => {
                let (waypoint, speed) = trajectory.next_waypoint();
                (Pose2D::from_position(waypoint, *orientation), speed)
            }
            MotionTarget::Pose(pose) => (*pose, 0.0),
        }
    }
}

/// Controller state of one robot
#[derive(Debug, Clone)]
pub struct RobotMotion {
    id: RobotId,
    setting: ControlSetting,
    limits: DynamicLimits,
    x_controller: Pid,
    y_controller: Pid,
    angle_controller: Pid,
    last_translation_cmd: Point2D,
    next_speed: f64,
    target_reached: bool,
}

impl RobotMotion {
    pub fn new(id: RobotId, setting: ControlSetting) -> Self {
        RobotMotion {
            id,
            x_controller: Pid::from_setting(&setting.translation),
            y_controller: Pid::from_setting(&setting.translation),
            angle_controller: Pid::from_setting(&setting.rotation),
            setting,
            limits: DynamicLimits::default(),
            last_translation_cmd: Point2D::zeros(),
            next_speed: 0.0,
            target_reached: false,
        }
    }

    pub fn id(&self) -> RobotId {
        self.id
    }

    pub fn setting(&self) -> &ControlSetting {
        &self.setting
    }

    /// Speed of the trapezoidal profile after the last tick (mm/s)
    pub fn next_speed(&self) -> f64 {
        self.next_speed
    }

    /// Whether the robot was inside the braking distance at the last tick
    pub fn target_reached(&self) -> bool {
        self.target_reached
    }

    /// Field-frame translation commanded at the last tick
    pub fn last_translation_cmd(&self) -> Point2D {
        self.last_translation_cmd
    }

    /// Compute the command for this tick
    pub fn update(
        &mut self,
        robot: &RobotState,
        target: MotionTarget<'_>,
        cruise_speed: f64,
        dt: f64,
    ) -> Result<VelocityCommand> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(NavError::invalid(format!("tick interval must be positive, got {}", dt)));
        }
        self.limits = robot.limits;
        let cruise_speed = cruise_speed.abs();

        let (target_pose, target_speed) = target.next_target();
        let position_error = target_pose.position - robot.pose.position;
        let heading_error = wrap_to_pi(target_pose.orientation - robot.pose.orientation);

        let rotation_cmd = self.angle_controller.update(heading_error);
        let rotation_cmd = self.apply_rotation_constraints(rotation_cmd);

        let braking_distance = self.braking_distance(target_speed, cruise_speed);
        self.target_reached = position_error.norm() <= braking_distance;

        let translation_cmd =
            if self.target_reached && target_speed <= self.setting.translation.deadzone {
                self.next_speed = 0.0;
                Point2D::new(
                    self.x_controller.update(position_error.x),
                    self.y_controller.update(position_error.y),
                )
            } else {
                self.next_velocity(&position_error, target_speed, cruise_speed, dt)
            };
        let translation_cmd = self.apply_translation_constraints(translation_cmd, dt);

        trace!(
            robot_id = self.id,
            distance = position_error.norm(),
            next_speed = self.next_speed,
            reached = self.target_reached,
            "motion update"
        );
        Ok(VelocityCommand {
            translation: field_to_robot(&translation_cmd, robot.pose.orientation),
            angular: rotation_cmd,
        })
    }

    /// Reset every loop and the speed profile
    pub fn stop(&mut self) {
        self.angle_controller.reset();
        self.x_controller.reset();
        self.y_controller.reset();
        self.last_translation_cmd = Point2D::zeros();
        self.next_speed = 0.0;
        self.target_reached = false;
    }

    /// Distance needed to go from cruise speed to `target_speed`, with margin
    fn braking_distance(&self, target_speed: f64, cruise_speed: f64) -> f64 {
        if self.limits.max_acceleration <= 0.0 {
            return 0.0;
        }
        let distance = 0.5 * (target_speed * target_speed - cruise_speed * cruise_speed)
            / self.limits.max_acceleration;
        BRAKING_MARGIN * distance.abs()
    }

    /// One step of the trapezoidal speed profile, along the direction to the target
    fn next_velocity(
        &mut self,
        position_error: &Point2D,
        target_speed: f64,
        cruise_speed: f64,
        dt: f64,
    ) -> Point2D {
        let step = self.limits.max_acceleration.max(0.0) * dt;
        if self.target_reached {
            if self.next_speed < target_speed {
                self.next_speed = (self.next_speed + step).min(target_speed);
            } else {
                self.next_speed -= step;
            }
        } else if self.next_speed < cruise_speed {
            self.next_speed += step;
        }
        self.next_speed = self.next_speed.min(cruise_speed).max(0.0);

        normalized(position_error) * self.next_speed
    }

    fn apply_rotation_constraints(&self, rotation_cmd: f64) -> f64 {
        let max_speed = self.limits.max_angular_speed.max(0.0);
        let rotation_cmd = rotation_cmd.min(max_speed).max(-max_speed);
        apply_deadzone(rotation_cmd, &self.setting.rotation)
            .min(max_speed)
            .max(-max_speed)
    }

    fn apply_translation_constraints(&mut self, translation_cmd: Point2D, dt: f64) -> Point2D {
        let translation_cmd = self.limit_acceleration(translation_cmd, dt);
        let translation_cmd = self.limit_speed(translation_cmd);
        let filtered = Point2D::new(
            apply_deadzone(translation_cmd.x, &self.setting.translation),
            apply_deadzone(translation_cmd.y, &self.setting.translation),
        );
        // the deadzone floor can lift one axis past the speed bound
        self.limit_speed(filtered)
    }

    /// Bound the change from the previous command to `max_acceleration * dt`,
    /// along the direction of the requested change
    fn limit_acceleration(&mut self, translation_cmd: Point2D, dt: f64) -> Point2D {
        let delta = translation_cmd - self.last_translation_cmd;
        let max_delta = self.limits.max_acceleration.max(0.0) * dt;
        let limited = if delta.norm() > max_delta {
            self.last_translation_cmd + normalized(&delta) * max_delta
        } else {
            translation_cmd
        };
        self.last_translation_cmd = limited;
        limited
    }

    fn limit_speed(&self, translation_cmd: Point2D) -> Point2D {
        let max_speed = self.limits.max_speed.max(0.0);
        if translation_cmd.norm() > max_speed {
            normalized(&translation_cmd) * max_speed
        } else {
            translation_cmd
        }
    }
}

/// Snap values under the sensibility to zero and raise values under the
/// deadzone to the deadzone, keeping the sign
fn apply_deadzone(value: f64, setting: &PidSetting) -> f64 {
    if value.abs() < setting.sensibility {
        0.0
    } else if value.abs() < setting.deadzone {
        setting.deadzone.copysign(value)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::Team;
    use std::f64::consts::PI;

    const DT: f64 = 1.0 / 60.0;

    fn robot_at(x: f64, y: f64, orientation: f64) -> RobotState {
        RobotState::new(0, Team::Friend, Pose2D::new(x, y, orientation))
    }

    #[test]
    fn test_rejects_bad_tick_interval() {
        let mut motion = RobotMotion::new(0, ControlSetting::simulation());
        let target = MotionTarget::Pose(Pose2D::new(1000.0, 0.0, 0.0));
        for dt in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                motion.update(&robot_at(0.0, 0.0, 0.0), target, 1000.0, dt),
                Err(NavError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_first_tick_accelerates_toward_waypoint() {
        let mut motion = RobotMotion::new(0, ControlSetting::simulation());
        let trajectory = Trajectory::from_points(
            vec![Point2D::new(0.0, 0.0), Point2D::new(2000.0, 0.0), Point2D::new(2000.0, 2000.0)],
            Some(vec![0.0, 400.0, 0.0]),
            None,
        )
        .unwrap();
        let target = MotionTarget::Path {
            trajectory: &trajectory,
            orientation: 0.0,
        };

        let command = motion
            .update(&robot_at(0.0, 0.0, 0.0), target, 1000.0, DT)
            .unwrap();
        let step = 2000.0 * DT;
        assert!((command.translation.x - step).abs() < 1e-9);
        assert!(command.translation.y.abs() < 1e-9);
        assert!(!motion.target_reached());
        assert!((motion.next_speed() - step).abs() < 1e-9);
    }

    #[test]
    fn test_command_is_in_robot_frame() {
        let mut motion = RobotMotion::new(0, ControlSetting::simulation());
        // facing +y, target straight ahead along the field y axis
        let target = MotionTarget::Pose(Pose2D::new(0.0, 2000.0, PI / 2.0));
        let command = motion
            .update(&robot_at(0.0, 0.0, PI / 2.0), target, 1000.0, DT)
            .unwrap();
        assert!(command.translation.x > 0.0);
        assert!(command.translation.y.abs() < 1e-9);
        assert_eq!(command.angular, 0.0);
    }

    #[test]
    fn test_positional_pid_near_stopping_target() {
        let mut motion = RobotMotion::new(0, ControlSetting::simulation());
        let target = MotionTarget::Pose(Pose2D::new(10.0, 0.0, 0.0));
        let command = motion
            .update(&robot_at(0.0, 0.0, 0.0), target, 1000.0, DT)
            .unwrap();
        assert!(motion.target_reached());
        assert_eq!(motion.next_speed(), 0.0);
        // kp * 10 + ki * 10
        assert!((command.translation.x - 8.1).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_is_clamped() {
        let mut motion = RobotMotion::new(0, ControlSetting::simulation());
        let robot = robot_at(0.0, 0.0, 0.0).with_limits(DynamicLimits {
            max_angular_speed: 1.0,
            ..DynamicLimits::default()
        });
        let command = motion
            .update(&robot, MotionTarget::Pose(Pose2D::new(0.0, 0.0, 3.0)), 1000.0, DT)
            .unwrap();
        assert_eq!(command.angular, 1.0);
    }

    #[test]
    fn test_heading_error_takes_the_short_way() {
        let mut motion = RobotMotion::new(0, ControlSetting::simulation());
        // 3π/2 to the left is π/2 to the right
        let command = motion
            .update(
                &robot_at(0.0, 0.0, 0.0),
                MotionTarget::Pose(Pose2D::new(0.0, 0.0, 1.5 * PI)),
                1000.0,
                DT,
            )
            .unwrap();
        assert!((command.angular + PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_physical_deadzone_and_sensibility() {
        let setting = ControlSetting::physical();
        assert_eq!(apply_deadzone(10.0, &setting.translation), 0.0);
        assert_eq!(apply_deadzone(-50.0, &setting.translation), -80.0);
        assert_eq!(apply_deadzone(120.0, &setting.translation), 120.0);
        assert_eq!(apply_deadzone(0.07, &setting.rotation), 0.1);
    }

    #[test]
    fn test_acceleration_limit_follows_requested_change() {
        let mut motion = RobotMotion::new(0, ControlSetting::simulation());
        motion.last_translation_cmd = Point2D::new(1000.0, 0.0);
        let limited = motion.limit_acceleration(Point2D::new(0.0, 1000.0), 0.01);
        let expected = Point2D::new(1000.0, 0.0)
            + normalized(&Point2D::new(-1000.0, 1000.0)) * 20.0;
        assert!((limited - expected).norm() < 1e-9);
        assert_eq!(motion.last_translation_cmd(), limited);
    }

    #[test]
    fn test_stop_resets_state() {
        let mut motion = RobotMotion::new(0, ControlSetting::simulation());
        motion
            .update(&robot_at(0.0, 0.0, 0.0), MotionTarget::Pose(Pose2D::new(3000.0, 0.0, 0.0)), 1000.0, DT)
            .unwrap();
        assert!(motion.next_speed() > 0.0);
        motion.stop();
        assert_eq!(motion.next_speed(), 0.0);
        assert_eq!(motion.last_translation_cmd(), Point2D::zeros());
        assert!(!motion.target_reached());
    }
}
