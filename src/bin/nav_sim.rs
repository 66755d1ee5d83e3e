//! Kinematic simulation driving the navigation core at a fixed tick rate.
//!
//! Usage:
//!   cargo run --bin nav_sim -- --config config/navigation.yaml
//!   RUST_LOG=ssl_nav_core=debug cargo run --bin nav_sim -- --fast

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use ssl_nav_core::behaviors::AiCommand;
use ssl_nav_core::common::geometry::{distance, robot_to_field, wrap_to_pi};
use ssl_nav_core::common::{Point2D, Pose2D, RobotId};
use ssl_nav_core::config::NavConfig;
use ssl_nav_core::control::motion::VelocityCommand;
use ssl_nav_core::perception::{RobotState, Team, WorldSnapshot};
use ssl_nav_core::NavigationCore;

/// Robot driven through the obstacle field
const DRIVEN_ROBOT: RobotId = 0;

/// Arrival tolerance (mm)
const ARRIVAL_DISTANCE: f64 = 10.0;

#[derive(Parser)]
#[command(name = "nav_sim")]
#[command(about = "Drive a simulated robot across a field of opponents")]
struct Args {
    /// YAML navigation configuration; defaults are used when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of ticks to simulate
    #[arg(short, long, default_value_t = 900)]
    ticks: u32,

    /// Tick rate (Hz)
    #[arg(long, default_value_t = 60.0)]
    rate: f64,

    /// Cruise speed (mm/s)
    #[arg(long, default_value_t = 1500.0)]
    cruise_speed: f64,

    /// Run as fast as possible instead of in real time
    #[arg(long)]
    fast: bool,
}

fn initial_world() -> WorldSnapshot {
    WorldSnapshot::new(vec![
        RobotState::new(DRIVEN_ROBOT, Team::Friend, Pose2D::new(-3000.0, 0.0, 0.0)),
        RobotState::new(1, Team::Friend, Pose2D::new(-1000.0, -900.0, 0.0)),
        RobotState::new(0, Team::Foe, Pose2D::new(-1000.0, 0.0, 0.0)),
        RobotState::new(1, Team::Foe, Pose2D::new(0.0, -150.0, 0.0)),
        RobotState::new(2, Team::Foe, Pose2D::new(0.0, 250.0, 0.0)),
        RobotState::new(3, Team::Foe, Pose2D::new(1200.0, 80.0, 0.0)),
    ])
}

/// Apply robot-frame commands to the friendly robots for one tick
fn integrate(world: &mut WorldSnapshot, velocities: &BTreeMap<RobotId, VelocityCommand>, dt: f64) {
    for (&robot_id, command) in velocities {
        if let Some(robot) = world.friend_mut(robot_id) {
            let velocity = robot_to_field(&command.translation, robot.pose.orientation);
            robot.pose.position += velocity * dt;
            robot.pose.orientation = wrap_to_pi(robot.pose.orientation + command.angular * dt);
            robot.velocity = velocity;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if !(args.rate > 0.0) {
        anyhow::bail!("tick rate must be positive, got {}", args.rate);
    }

    let config = match &args.config {
        Some(path) => NavConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => NavConfig::default(),
    };
    info!(profile = ?config.control.profile, "configuration loaded");

    let mut core = NavigationCore::new(config)?;
    core.init()?;

    let dt = 1.0 / args.rate;
    let mut ticker = interval(Duration::from_secs_f64(dt));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let goal = Pose2D::new(3000.0, 0.0, std::f64::consts::FRAC_PI_2);
    let mut world = initial_world();
    let mut commands = BTreeMap::new();
    commands.insert(DRIVEN_ROBOT, AiCommand::move_to(goal, args.cruise_speed));
    commands.insert(1, AiCommand::speed(Pose2D::new(0.0, 300.0, 0.0)));

    let mut arrived_at = None;
    for tick in 0..args.ticks {
        if !args.fast {
            ticker.tick().await;
        }

        let velocities = core.tick(&world, &mut commands, dt)?;
        integrate(&mut world, &velocities, dt);

        let robot = world
            .friend(DRIVEN_ROBOT)
            .context("driven robot left the world snapshot")?;
        let remaining = distance(&robot.position(), &goal.position);
        if tick % 60 == 0 {
            let path_points = commands
                .get(&DRIVEN_ROBOT)
                .and_then(|command| command.path.as_ref())
                .map_or(0, |path| path.len());
            info!(
                tick,
                x = robot.pose.position.x,
                y = robot.pose.position.y,
                speed = robot.velocity.norm(),
                remaining,
                path_points,
                "robot state"
            );
        }
        if remaining < ARRIVAL_DISTANCE && robot.velocity.norm() < ARRIVAL_DISTANCE {
            arrived_at = Some(tick);
            break;
        }
    }

    commands.insert(DRIVEN_ROBOT, AiCommand::stop());
    commands.insert(1, AiCommand::stop());
    core.tick(&world, &mut commands, dt)?;
    core.shutdown()?;

    let final_position: Point2D = world
        .friend(DRIVEN_ROBOT)
        .map(RobotState::position)
        .unwrap_or_else(Point2D::zeros);
    match arrived_at {
        Some(tick) => info!(
            tick,
            seconds = f64::from(tick) * dt,
            "goal reached"
        ),
        None => warn!(
            x = final_position.x,
            y = final_position.y,
            "goal not reached within the tick budget"
        ),
    }
    Ok(())
}
