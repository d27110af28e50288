use ballplate_control::{PidGains, PlateLimits, Session};
use ballplate_vision::HsvThresholds;
use serde::{Deserialize, Serialize};

use crate::config::RuntimeConfig;

/// Everything the command handler may change while the worker runs.
///
/// The handler is the only writer; the worker copies the latest snapshot
/// once at the start of each tick, so a change takes effect at the next
/// cycle boundary.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TuningSnapshot {
    pub gains: PidGains,
    pub thresholds: HsvThresholds,
    pub limits: PlateLimits,
    pub session: Session,
}

impl TuningSnapshot {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            gains: config.gains,
            thresholds: config.vision.thresholds,
            limits: config.limits,
            session: Session::default(),
        }
    }
}
