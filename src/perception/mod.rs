//! Perception module: the per-tick snapshot of every robot on the field

use crate::common::{Point2D, Pose2D, RobotId};

/// Which side a robot plays for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Team {
    Friend,
    Foe,
}

/// Dynamic limits of a robot, refreshed every tick from its live profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicLimits {
    /// mm/s²
    pub max_acceleration: f64,
    /// mm/s
    pub max_speed: f64,
    /// rad/s
    pub max_angular_speed: f64,
}

impl Default for DynamicLimits {
    fn default() -> Self {
        DynamicLimits {
            max_acceleration: 2000.0,
            max_speed: 2000.0,
            max_angular_speed: 2.0 * std::f64::consts::PI,
        }
    }
}

/// Live state of one robot
#[derive(Debug, Clone, PartialEq)]
pub struct RobotState {
    pub id: RobotId,
    pub team: Team,
    pub pose: Pose2D,
    /// Field-frame velocity (mm/s)
    pub velocity: Point2D,
    pub limits: DynamicLimits,
}

impl RobotState {
    pub fn new(id: RobotId, team: Team, pose: Pose2D) -> Self {
        RobotState {
            id,
            team,
            pose,
            velocity: Point2D::zeros(),
            limits: DynamicLimits::default(),
        }
    }

    pub fn with_velocity(mut self, velocity: Point2D) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_limits(mut self, limits: DynamicLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn position(&self) -> Point2D {
        self.pose.position
    }
}

/// Every robot seen by vision during one tick
#[derive(Debug, Clone, Default)]
pub struct WorldSnapshot {
    robots: Vec<RobotState>,
}

impl WorldSnapshot {
    pub fn new(robots: Vec<RobotState>) -> Self {
        WorldSnapshot { robots }
    }

    pub fn friends(&self) -> impl Iterator<Item = &RobotState> {
        self.robots.iter().filter(|r| r.team == Team::Friend)
    }

    /// A friendly robot by id
    pub fn friend(&self, id: RobotId) -> Option<&RobotState> {
        self.friends().find(|r| r.id == id)
    }

    pub fn friend_mut(&mut self, id: RobotId) -> Option<&mut RobotState> {
        self.robots
            .iter_mut()
            .find(|r| r.team == Team::Friend && r.id == id)
    }

    /// Obstacles seen by friendly robot `id`: every other teammate and every opponent
    pub fn obstacles_for(&self, id: RobotId) -> ObstacleSnapshot {
        let positions = self
            .robots
            .iter()
            .filter(|r| !(r.team == Team::Friend && r.id == id))
            .map(RobotState::position)
            .collect();
        ObstacleSnapshot::new(positions)
    }
}

/// Obstacle positions frozen for the duration of one planning call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObstacleSnapshot {
    positions: Vec<Point2D>,
}

impl ObstacleSnapshot {
    pub fn new(positions: Vec<Point2D>) -> Self {
        ObstacleSnapshot { positions }
    }

    pub fn positions(&self) -> &[Point2D] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obstacles_exclude_planning_robot_only() {
        let world = WorldSnapshot::new(vec![
            RobotState::new(0, Team::Friend, Pose2D::new(0.0, 0.0, 0.0)),
            RobotState::new(1, Team::Friend, Pose2D::new(100.0, 0.0, 0.0)),
            RobotState::new(0, Team::Foe, Pose2D::new(200.0, 0.0, 0.0)),
            RobotState::new(3, Team::Foe, Pose2D::new(300.0, 0.0, 0.0)),
        ]);

        let obstacles = world.obstacles_for(0);
        assert_eq!(obstacles.len(), 3);
        assert!(!obstacles.positions().contains(&Point2D::new(0.0, 0.0)));
        assert!(obstacles.positions().contains(&Point2D::new(200.0, 0.0)));
    }

    #[test]
    fn test_friend_lookup_ignores_foes() {
        let mut world = WorldSnapshot::new(vec![RobotState::new(
            4,
            Team::Foe,
            Pose2D::default(),
        )]);
        assert!(world.friend(4).is_none());
        assert!(world.friend_mut(4).is_none());
    }
}
