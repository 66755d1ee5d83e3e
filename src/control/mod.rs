//! Control module: turns AI commands into per-robot velocity commands
pub mod controllers;
pub mod motion;

use std::collections::BTreeMap;

use tracing::{debug, info};

use self::motion::{MotionTarget, RobotMotion, VelocityCommand};
use crate::behaviors::{AiCommand, CommandKind, ControlLoopType};
use crate::common::geometry::field_to_robot;
use crate::common::RobotId;
use crate::config::ControlSetting;
use crate::error::Result;
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, State};
use crate::perception::{RobotState, WorldSnapshot};

/// Control stack holding one motion controller per friendly robot
pub struct ControlStack {
    base: LifecycleNodeBase,
    setting: ControlSetting,
    motions: BTreeMap<RobotId, RobotMotion>,
}

impl ControlStack {
    /// Create a new control stack
    pub fn new(setting: ControlSetting) -> Self {
        ControlStack {
            base: LifecycleNodeBase::new("control_stack"),
            setting,
            motions: BTreeMap::new(),
        }
    }

    /// Controller of `robot_id`, if it already received a command
    pub fn motion(&self, robot_id: RobotId) -> Option<&RobotMotion> {
        self.motions.get(&robot_id)
    }

    fn motion_mut(&mut self, robot_id: RobotId) -> &mut RobotMotion {
        let setting = &self.setting;
        self.motions
            .entry(robot_id)
            .or_insert_with(|| RobotMotion::new(robot_id, setting.clone()))
    }

    /// Closed-loop command for one robot toward `target`
    pub fn compute_command(
        &mut self,
        robot: &RobotState,
        target: MotionTarget<'_>,
        cruise_speed: f64,
        dt: f64,
    ) -> Result<VelocityCommand> {
        self.motion_mut(robot.id).update(robot, target, cruise_speed, dt)
    }

    /// Reset the controller of one robot
    pub fn stop(&mut self, robot_id: RobotId) {
        if let Some(motion) = self.motions.get_mut(&robot_id) {
            motion.stop();
        }
    }

    /// Command for every friendly robot that has an AI command this tick
    pub fn exec(
        &mut self,
        world: &WorldSnapshot,
        commands: &BTreeMap<RobotId, AiCommand>,
        dt: f64,
    ) -> Result<BTreeMap<RobotId, VelocityCommand>> {
        let mut velocities = BTreeMap::new();
        for robot in world.friends() {
            let Some(command) = commands.get(&robot.id) else {
                continue;
            };
            let velocity = match command.kind {
                CommandKind::Move(ControlLoopType::Position) => {
                    let target = match &command.path {
                        Some(trajectory) => MotionTarget::Path {
                            trajectory,
                            orientation: command.pose_goal.orientation,
                        },
                        None => MotionTarget::Pose(command.pose_goal),
                    };
                    self.compute_command(robot, target, command.cruise_speed, dt)?
                }
                CommandKind::Move(ControlLoopType::Speed) => {
                    let translation =
                        field_to_robot(&command.pose_goal.position, robot.pose.orientation);
                    VelocityCommand {
                        translation,
                        angular: command.pose_goal.orientation,
                    }
                }
                CommandKind::Move(ControlLoopType::Open) => VelocityCommand {
                    translation: command.pose_goal.position,
                    angular: command.pose_goal.orientation,
                },
                CommandKind::Stop => {
                    self.stop(robot.id);
                    VelocityCommand::zero()
                }
            };
            velocities.insert(robot.id, velocity);
        }
        debug!(robots = velocities.len(), "control tick");
        Ok(velocities)
    }
}

impl LifecycleNode for ControlStack {
    fn on_configure(&mut self) -> Result<()> {
        info!("Configuring control stack");
        self.base.transition(State::Inactive)
    }

    fn on_activate(&mut self) -> Result<()> {
        info!("Activating control stack");
        self.base.transition(State::Active)
    }

    fn on_deactivate(&mut self) -> Result<()> {
        info!(robots = self.motions.len(), "Deactivating control stack");
        self.motions.values_mut().for_each(RobotMotion::stop);
        self.base.transition(State::Inactive)
    }

    fn on_cleanup(&mut self) -> Result<()> {
        info!("Cleaning up control stack");
        self.motions.clear();
        self.base.transition(State::Unconfigured)
    }

    fn state(&self) -> State {
        self.base.get_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Point2D, Pose2D};
    use crate::perception::Team;
    use std::f64::consts::PI;

    fn world() -> WorldSnapshot {
        WorldSnapshot::new(vec![
            RobotState::new(0, Team::Friend, Pose2D::new(0.0, 0.0, PI / 2.0)),
            RobotState::new(1, Team::Friend, Pose2D::new(500.0, 0.0, 0.0)),
            RobotState::new(2, Team::Foe, Pose2D::new(900.0, 0.0, 0.0)),
        ])
    }

    #[test]
    fn test_speed_loop_rotates_into_robot_frame() {
        let mut stack = ControlStack::new(ControlSetting::simulation());
        let mut commands = BTreeMap::new();
        commands.insert(0, AiCommand::speed(Pose2D::new(0.0, 500.0, 0.3)));

        let velocities = stack.exec(&world(), &commands, 1.0 / 60.0).unwrap();
        let command = velocities[&0];
        assert!((command.translation - Point2D::new(500.0, 0.0)).norm() < 1e-9);
        assert_eq!(command.angular, 0.3);
    }

    #[test]
    fn test_open_loop_passes_through() {
        let mut stack = ControlStack::new(ControlSetting::simulation());
        let mut commands = BTreeMap::new();
        commands.insert(0, AiCommand::open_loop(Pose2D::new(0.0, 500.0, 0.3)));

        let velocities = stack.exec(&world(), &commands, 1.0 / 60.0).unwrap();
        assert_eq!(velocities[&0], VelocityCommand::new(0.0, 500.0, 0.3));
    }

    #[test]
    fn test_stop_resets_controller() {
        let mut stack = ControlStack::new(ControlSetting::simulation());
        let mut commands = BTreeMap::new();
        commands.insert(1, AiCommand::move_to(Pose2D::new(3000.0, 0.0, 0.0), 1000.0));
        stack.exec(&world(), &commands, 1.0 / 60.0).unwrap();
        assert!(stack.motion(1).unwrap().next_speed() > 0.0);

        commands.insert(1, AiCommand::stop());
        let velocities = stack.exec(&world(), &commands, 1.0 / 60.0).unwrap();
        assert_eq!(velocities[&1], VelocityCommand::zero());
        assert_eq!(stack.motion(1).unwrap().next_speed(), 0.0);
    }

    #[test]
    fn test_robots_without_command_or_foes_are_skipped() {
        let mut stack = ControlStack::new(ControlSetting::simulation());
        let mut commands = BTreeMap::new();
        commands.insert(2, AiCommand::move_to(Pose2D::new(0.0, 0.0, 0.0), 1000.0));
        let velocities = stack.exec(&world(), &commands, 1.0 / 60.0).unwrap();
        assert!(velocities.is_empty());
    }

    #[test]
    fn test_bad_tick_interval_is_an_error() {
        let mut stack = ControlStack::new(ControlSetting::simulation());
        let mut commands = BTreeMap::new();
        commands.insert(1, AiCommand::move_to(Pose2D::new(3000.0, 0.0, 0.0), 1000.0));
        assert!(stack.exec(&world(), &commands, 0.0).is_err());
    }

    #[test]
    fn test_lifecycle_resets_controllers() {
        let mut stack = ControlStack::new(ControlSetting::simulation());
        stack.on_configure().unwrap();
        stack.on_activate().unwrap();
        let mut commands = BTreeMap::new();
        commands.insert(1, AiCommand::move_to(Pose2D::new(3000.0, 0.0, 0.0), 1000.0));
        stack.exec(&world(), &commands, 1.0 / 60.0).unwrap();

        stack.on_deactivate().unwrap();
        assert_eq!(stack.motion(1).unwrap().next_speed(), 0.0);
        stack.on_cleanup().unwrap();
        assert!(stack.motion(1).is_none());
        assert_eq!(stack.state(), State::Unconfigured);
    }
}
