/// Reasons a lifecycle transition is refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("control loop is running")]
    ControlRunning,
    #[error("control loop is not running")]
    ControlNotRunning,
    #[error("hand is closed")]
    HandClosed,
    #[error("hand is not closed")]
    HandNotClosed,
    #[error("encoder reading has {got} joints, need at least {needed}")]
    MissingEncoder { needed: usize, got: usize },
}
