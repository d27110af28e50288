use std::path::PathBuf;

use ballplate_control::LifecycleError;

/// Errors raised while loading or validating a [`RuntimeConfig`](crate::RuntimeConfig).
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("calibration for the {camera} camera is missing")]
    MissingCalibration { camera: &'static str },
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Errors reported by an actuator or sensor collaborator.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("{device} reports {got} joints, expected {expected}")]
    JointCountMismatch {
        device: String,
        expected: usize,
        got: usize,
    },
    #[error("{device} is unavailable")]
    Unavailable { device: String },
    #[error("{device}: {message}")]
    Driver { device: String, message: String },
}

/// Reasons a lifecycle command failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("worker is not accepting motion plans")]
    WorkerGone,
}

/// Errors from starting, driving or stopping the [`Runtime`](crate::Runtime).
#[derive(thiserror::Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("command channel closed")]
    ChannelClosed,
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
