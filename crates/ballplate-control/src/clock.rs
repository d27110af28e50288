use serde::{Deserialize, Serialize};

/// Inter-cycle time step, smoothed over two samples.
///
/// Each new capture timestamp yields `dt = (raw + previous_raw) / 2`. The
/// first timestamp only primes the clock; the second uses its raw delta as
/// is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleClock {
    last_stamp: Option<f64>,
    last_raw: Option<f64>,
}

impl CycleClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a capture timestamp (seconds), returning the smoothed step.
    ///
    /// Returns `None` while priming and when the smoothed step is not a
    /// positive finite number (repeated or out-of-order stamps).
    pub fn tick(&mut self, stamp: f64) -> Option<f64> {
        let last = self.last_stamp.replace(stamp)?;
        let raw = stamp - last;
        let dt = match self.last_raw.replace(raw) {
            Some(prev) => (raw + prev) / 2.0,
            None => raw,
        };
        (dt.is_finite() && dt > 0.0).then_some(dt)
    }

    pub fn last_stamp(&self) -> Option<f64> {
        self.last_stamp
    }
}
