//! Lifecycle management for the navigation core components

use tracing::info;

use crate::error::{NavError, Result};

/// Trait for components that follow a lifecycle pattern
pub trait LifecycleNode: Send + Sync {
    /// Configure the node
    fn on_configure(&mut self) -> Result<()>;

    /// Activate the node
    fn on_activate(&mut self) -> Result<()>;

    /// Deactivate the node
    fn on_deactivate(&mut self) -> Result<()>;

    /// Clean up the node
    fn on_cleanup(&mut self) -> Result<()>;

    /// Current lifecycle state
    fn state(&self) -> State;
}

/// Base implementation for lifecycle nodes
#[derive(Debug)]
pub struct LifecycleNodeBase {
    pub name: String,
    state: State,
}

/// State of a lifecycle node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unconfigured,
    Inactive,
    Active,
}

impl State {
    /// Whether the lifecycle allows going from `self` to `next`
    pub fn can_transition_to(self, next: State) -> bool {
        matches!(
            (self, next),
            (State::Unconfigured, State::Inactive)
                | (State::Inactive, State::Active)
                | (State::Active, State::Inactive)
                | (State::Inactive, State::Unconfigured)
        )
    }
}

impl LifecycleNodeBase {
    /// Create a new lifecycle node base
    pub fn new(name: &str) -> Self {
        LifecycleNodeBase {
            name: name.to_string(),
            state: State::Unconfigured,
        }
    }

    /// Get the current state
    pub fn get_state(&self) -> State {
        self.state
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow
    pub fn transition(&mut self, next: State) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(NavError::Lifecycle(format!(
                "{}: cannot go from {:?} to {:?}",
                self.name, self.state, next
            )));
        }
        info!(node = %self.name, from = ?self.state, to = ?next, "lifecycle transition");
        self.state = next;
        Ok(())
    }
}
