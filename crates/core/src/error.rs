//! Error types for AvdPilot
//!
//! Centralized error handling using thiserror.

use avdpilot_device_bridge::{
    ExecError, InstallError, NetworkToggleFailed, ReadinessError, SupervisorError,
};
use thiserror::Error;

/// Main error type for harness operations
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("device command failed: {0}")]
    Exec(#[from] ExecError),

    #[error("process supervision failed: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("device readiness failed: {0}")]
    Readiness(#[from] ReadinessError),

    #[error("package handling failed: {0}")]
    Install(#[from] InstallError),

    #[error("network toggle failed: {0}")]
    Network(#[from] NetworkToggleFailed),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;
