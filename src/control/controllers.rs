//! Controllers for the robot

use std::collections::VecDeque;

use crate::config::PidSetting;

/// PID loop with a sliding-window integral term.
///
/// Only the last `antiwindup` errors are summed; a window of 0 keeps every
/// error since the last reset.
#[derive(Debug, Clone)]
pub struct Pid {
    kp: f64,
    ki: f64,
    kd: f64,
    antiwindup: usize,
    errors: VecDeque<f64>,
    error_sum: f64,
    last_error: f64,
}

impl Pid {
    /// Create a new controller
    pub fn new(kp: f64, ki: f64, kd: f64, antiwindup: usize) -> Self {
        Pid {
            kp,
            ki,
            kd,
            antiwindup,
            errors: VecDeque::with_capacity(antiwindup),
            error_sum: 0.0,
            last_error: 0.0,
        }
    }

    pub fn from_setting(setting: &PidSetting) -> Self {
        Pid::new(setting.kp, setting.ki, setting.kd, setting.antiwindup)
    }

    /// Feed a new error and compute the command
    pub fn update(&mut self, error: f64) -> f64 {
        if self.antiwindup > 0 {
            self.errors.push_back(error);
            if self.errors.len() > self.antiwindup {
                self.errors.pop_front();
            }
            // summed again each time so the window never drifts
            self.error_sum = self.errors.iter().sum();
        } else {
            self.error_sum += error;
        }

        let derivative = error - self.last_error;
        self.last_error = error;
        self.kp * error + self.ki * self.error_sum + self.kd * derivative
    }

    pub fn reset(&mut self) {
        self.errors.clear();
        self.error_sum = 0.0;
        self.last_error = 0.0;
    }
}
