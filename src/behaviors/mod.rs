//! Behaviors module: the command each robot receives from the strategy layer

use crate::common::Pose2D;
use crate::navigation::trajectory::Trajectory;

/// How a move command is turned into wheel velocities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLoopType {
    /// Closed loop on the position, following the planned path
    Position,
    /// `pose_goal` is a field-frame velocity, rotated into the robot frame
    Speed,
    /// `pose_goal` is sent verbatim as the command
    Open,
}

/// What the robot should do this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Move(ControlLoopType),
    Stop,
}

/// Command issued by a tactic for one robot
#[derive(Debug, Clone)]
pub struct AiCommand {
    pub kind: CommandKind,
    pub pose_goal: Pose2D,
    /// Nominal travel speed (mm/s)
    pub cruise_speed: f64,
    /// Whether the path planner should route this command around obstacles
    pub use_pathfinder: bool,
    /// Trajectory filled in by the navigation stack
    pub path: Option<Trajectory>,
}

impl AiCommand {
    /// Closed-loop move to `pose_goal` through the planner
    pub fn move_to(pose_goal: Pose2D, cruise_speed: f64) -> Self {
        AiCommand {
            kind: CommandKind::Move(ControlLoopType::Position),
            pose_goal,
            cruise_speed,
            use_pathfinder: true,
            path: None,
        }
    }

    /// Velocity command expressed in the field frame
    pub fn speed(velocity: Pose2D) -> Self {
        AiCommand {
            kind: CommandKind::Move(ControlLoopType::Speed),
            pose_goal: velocity,
            cruise_speed: 0.0,
            use_pathfinder: false,
            path: None,
        }
    }

    /// Raw robot-frame command
    pub fn open_loop(command: Pose2D) -> Self {
        AiCommand {
            kind: CommandKind::Move(ControlLoopType::Open),
            pose_goal: command,
            cruise_speed: 0.0,
            use_pathfinder: false,
            path: None,
        }
    }

    pub fn stop() -> Self {
        AiCommand {
            kind: CommandKind::Stop,
            pose_goal: Pose2D::default(),
            cruise_speed: 0.0,
            use_pathfinder: false,
            path: None,
        }
    }

    pub fn without_pathfinder(mut self) -> Self {
        self.use_pathfinder = false;
        self
    }

    /// True when this command needs a planned trajectory
    pub fn needs_path(&self) -> bool {
        self.use_pathfinder && self.kind == CommandKind::Move(ControlLoopType::Position)
    }
}
