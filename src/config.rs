//! Configuration loading for the navigation core
//!
//! Every tunable of the pipeline lives here so that callers (and tests) can
//! inject edge values instead of relying on constants baked into the code.
//! Files are YAML; every field is optional and falls back to its default.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NavError, Result};

/// Upper bound accepted for the planner recursion depth (2^depth segments)
const MAX_ACCEPTED_RECURSION_DEPTH: u32 = 12;

/// Main configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NavConfig {
    pub planner: PlannerConfig,
    pub cache: CacheConfig,
    pub reshaper: ReshaperConfig,
    pub control: ControlConfig,
}

/// Recursive planner parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    /// Clearance kept from every obstacle (mm)
    pub proxy_gap: f64,
    /// Step used to push a bypass point away from the obstacles (mm)
    pub resolution: f64,
    /// Recursion depth at which the planner gives up and returns its best effort
    pub max_recursion_depth: u32,
    /// Below this speed (mm/s) the robot velocity is ignored for side selection
    pub side_selection_min_speed: f64,
    /// Maximum number of outward steps when clearing a bypass point
    pub max_expansion_steps: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            proxy_gap: 200.0,
            resolution: 100.0,
            max_recursion_depth: 5,
            side_selection_min_speed: 100.0,
            max_expansion_steps: 50,
        }
    }
}

impl PlannerConfig {
    /// Override parameters from a flat parameter map
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        if let Some(&proxy_gap) = params.get("proxy_gap") {
            if proxy_gap <= 0.0 {
                return Err(NavError::Config("Proxy gap must be positive".to_string()));
            }
            self.proxy_gap = proxy_gap;
        }

        if let Some(&resolution) = params.get("resolution") {
            if resolution <= 0.0 {
                return Err(NavError::Config("Resolution must be positive".to_string()));
            }
            self.resolution = resolution;
        }

        if let Some(&depth) = params.get("max_recursion_depth") {
            if depth < 0.0 || depth > MAX_ACCEPTED_RECURSION_DEPTH as f64 {
                return Err(NavError::Config(format!(
                    "Max recursion depth must be within [0, {}]",
                    MAX_ACCEPTED_RECURSION_DEPTH
                )));
            }
            self.max_recursion_depth = depth as u32;
        }

        if let Some(&min_speed) = params.get("side_selection_min_speed") {
            if min_speed < 0.0 {
                return Err(NavError::Config(
                    "Side selection speed must be non-negative".to_string(),
                ));
            }
            self.side_selection_min_speed = min_speed;
        }

        if let Some(&steps) = params.get("max_expansion_steps") {
            if steps < 1.0 {
                return Err(NavError::Config(
                    "Max expansion steps must be at least 1".to_string(),
                ));
            }
            self.max_expansion_steps = steps as u32;
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.proxy_gap <= 0.0 || self.resolution <= 0.0 {
            return Err(NavError::Config(
                "Planner proxy gap and resolution must be positive".to_string(),
            ));
        }
        if self.max_recursion_depth > MAX_ACCEPTED_RECURSION_DEPTH {
            return Err(NavError::Config(format!(
                "Max recursion depth must be within [0, {}]",
                MAX_ACCEPTED_RECURSION_DEPTH
            )));
        }
        if self.max_expansion_steps == 0 {
            return Err(NavError::Config(
                "Max expansion steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Path reuse policy parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum goal displacement (mm) for which the previous path is reused
    pub goal_tolerance: f64,
    /// Clearance relaxation (mm) applied when checking a reused path
    pub reuse_margin: f64,
    /// Merge threshold (mm) used when the start of a cached path is advanced
    pub rebase_merge_threshold: f64,
    /// Interior points closer than this (mm) to their successor are dropped
    pub redundant_point_threshold: f64,
    /// Straight paths shorter than this (mm) are not planned at all
    pub min_path_length: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            goal_tolerance: 20.0,
            reuse_margin: 50.0,
            rebase_merge_threshold: 80.0,
            redundant_point_threshold: 5.0,
            min_path_length: 1.0,
        }
    }
}

/// Path reshaper parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReshaperConfig {
    /// Lateral deviation bound when cutting a corner (mm)
    pub max_deviation: f64,
    /// Consecutive points closer than this (mm) are merged
    pub merge_distance: f64,
    /// Factor applied to the corner speed while the deviation is too large
    pub speed_reduction_factor: f64,
    /// Bound on the number of speed reductions per corner
    pub max_speed_reductions: u32,
}

impl Default for ReshaperConfig {
    fn default() -> Self {
        ReshaperConfig {
            max_deviation: 50.0,
            merge_distance: 10.0,
            speed_reduction_factor: 0.4,
            max_speed_reductions: 32,
        }
    }
}

/// Which set of controller gains to use
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ControlProfile {
    #[default]
    Simulation,
    Physical,
}

/// Motion control parameters
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControlConfig {
    pub profile: ControlProfile,
    /// Explicit gains, overriding the profile when present
    pub setting: Option<ControlSetting>,
}

impl ControlConfig {
    /// Gains in effect for this configuration
    pub fn setting(&self) -> ControlSetting {
        self.setting.clone().unwrap_or_else(|| match self.profile {
            ControlProfile::Simulation => ControlSetting::simulation(),
            ControlProfile::Physical => ControlSetting::physical(),
        })
    }
}

/// Gains and output filtering of one PID loop.
///
/// Translation values are in mm/s, rotation values in rad/s.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PidSetting {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Number of past errors kept in the integral term (0 keeps them all)
    pub antiwindup: usize,
    /// Smallest non-zero command the motors can follow
    pub deadzone: f64,
    /// Commands below this magnitude are snapped to zero
    pub sensibility: f64,
}

/// Translation and rotation loops of a robot
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ControlSetting {
    pub translation: PidSetting,
    pub rotation: PidSetting,
}

impl ControlSetting {
    /// Gains for robots running in the simulator
    pub fn simulation() -> Self {
        ControlSetting {
            translation: PidSetting {
                kp: 0.8,
                ki: 0.01,
                kd: 0.0,
                antiwindup: 20,
                deadzone: 0.0,
                sensibility: 0.0,
            },
            rotation: PidSetting {
                kp: 1.0,
                ki: 0.0,
                kd: 0.0,
                antiwindup: 0,
                deadzone: 0.0,
                sensibility: 0.0,
            },
        }
    }

    /// Gains for the physical robots, whose motors stall below a minimum drive signal
    pub fn physical() -> Self {
        ControlSetting {
            translation: PidSetting {
                kp: 0.8,
                ki: 0.01,
                kd: 0.0,
                antiwindup: 20,
                deadzone: 80.0,
                sensibility: 20.0,
            },
            rotation: PidSetting {
                kp: 0.1,
                ki: 0.01,
                kd: 0.0,
                antiwindup: 10,
                deadzone: 0.1,
                sensibility: 0.05,
            },
        }
    }
}

impl NavConfig {
    /// Load and validate a configuration from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parse and validate a configuration from YAML text
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: NavConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all parameters are usable
    pub fn validate(&self) -> Result<()> {
        self.planner.validate()?;

        let cache = &self.cache;
        if cache.goal_tolerance < 0.0
            || cache.rebase_merge_threshold < 0.0
            || cache.redundant_point_threshold < 0.0
            || cache.min_path_length < 0.0
        {
            return Err(NavError::Config(
                "Cache thresholds must be non-negative".to_string(),
            ));
        }
        if cache.reuse_margin < 0.0 || cache.reuse_margin >= self.planner.proxy_gap {
            return Err(NavError::Config(
                "Reuse margin must be within [0, proxy_gap)".to_string(),
            ));
        }

        let reshaper = &self.reshaper;
        if reshaper.max_deviation <= 0.0 || reshaper.merge_distance < 0.0 {
            return Err(NavError::Config(
                "Reshaper deviation must be positive and merge distance non-negative".to_string(),
            ));
        }
        if !(reshaper.speed_reduction_factor > 0.0 && reshaper.speed_reduction_factor < 1.0) {
            return Err(NavError::Config(
                "Speed reduction factor must be within (0, 1)".to_string(),
            ));
        }

        let setting = self.control.setting();
        for (name, pid) in [("translation", &setting.translation), ("rotation", &setting.rotation)] {
            if pid.sensibility < 0.0 || pid.deadzone < 0.0 {
                return Err(NavError::Config(format!(
                    "{} deadzone and sensibility must be non-negative",
                    name
                )));
            }
        }

        Ok(())
    }
}
