//! Error types for the navigation core

use thiserror::Error;

/// Navigation core error type
#[derive(Error, Debug)]
pub enum NavError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),
}

impl NavError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        NavError::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, NavError>;
