pub mod behaviors;
pub mod common;
pub mod config;
pub mod control;
pub mod error;
pub mod lifecycle;
pub mod navigation;
pub mod perception;

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::behaviors::{AiCommand, CommandKind};
use crate::common::RobotId;
use crate::config::NavConfig;
use crate::control::motion::VelocityCommand;
use crate::control::ControlStack;
use crate::error::{NavError, Result};
use crate::lifecycle::{LifecycleNode, State};
use crate::navigation::NavigationStack;
use crate::perception::WorldSnapshot;

/// Navigation and control for every friendly robot, driven one tick at a time
pub struct NavigationCore {
    navigation: NavigationStack,
    control: ControlStack,
}

impl NavigationCore {
    /// Create the core from a validated configuration
    pub fn new(config: NavConfig) -> Result<Self> {
        config.validate()?;
        Ok(NavigationCore {
            navigation: NavigationStack::new(&config),
            control: ControlStack::new(config.control.setting()),
        })
    }

    /// Configure and activate both stacks
    pub fn init(&mut self) -> Result<()> {
        for component in self.components() {
            component.on_configure()?;
            component.on_activate()?;
        }
        info!("Navigation core active");
        Ok(())
    }

    /// Deactivate and clean up both stacks
    pub fn shutdown(&mut self) -> Result<()> {
        for component in self.components() {
            component.on_deactivate()?;
            component.on_cleanup()?;
        }
        info!("Navigation core shut down");
        Ok(())
    }

    fn components(&mut self) -> [&mut dyn LifecycleNode; 2] {
        [&mut self.navigation, &mut self.control]
    }

    pub fn navigation_stack(&self) -> &NavigationStack {
        &self.navigation
    }

    pub fn navigation_stack_mut(&mut self) -> &mut NavigationStack {
        &mut self.navigation
    }

    pub fn control_stack(&self) -> &ControlStack {
        &self.control
    }

    /// Run one tick: plan for every command that needs a path, store the
    /// reshaped trajectory in the command, then compute the velocity commands
    pub fn tick(
        &mut self,
        world: &WorldSnapshot,
        commands: &mut BTreeMap<RobotId, AiCommand>,
        dt: f64,
    ) -> Result<BTreeMap<RobotId, VelocityCommand>> {
        if self.navigation.state() != State::Active || self.control.state() != State::Active {
            return Err(NavError::Lifecycle(
                "tick called before the navigation core was activated".to_string(),
            ));
        }

        for (&robot_id, command) in commands.iter_mut() {
            if command.kind == CommandKind::Stop {
                self.navigation.invalidate(robot_id);
            } else if command.needs_path() {
                if world.friend(robot_id).is_none() {
                    warn!(robot_id, "robot not in the world snapshot, skipping path");
                    command.path = None;
                    continue;
                }
                let (reshaped, _raw) = self.navigation.plan_and_track(
                    robot_id,
                    &command.pose_goal,
                    command.cruise_speed,
                    world,
                )?;
                debug!(robot_id, points = reshaped.len(), "path ready");
                command.path = Some(reshaped);
            }
        }

        self.control.exec(world, commands, dt)
    }
}
