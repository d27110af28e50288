use serde::{Deserialize, Serialize};

/// Half-width of the soft band placed around a recomputed offset, degrees.
pub const SOFT_BAND: f64 = 5.0;

/// Static offset plus soft and hard bounds for one actuated joint, degrees.
///
/// Soft bounds are enforced on every control output; hard bounds only
/// constrain recomputed offsets and soft bounds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisLimits {
    pub offset: f64,
    pub soft: [f64; 2],
    pub hard: [f64; 2],
}

impl AxisLimits {
    pub fn new(offset: f64, soft: [f64; 2], hard: [f64; 2]) -> Self {
        Self { offset, soft, hard }
    }

    /// East-west tilt (joint 4).
    pub fn x_default() -> Self {
        Self::new(4.0, [-1.0, 9.0], [-15.0, 20.0])
    }

    /// South-north tilt (joint 6).
    pub fn y_default() -> Self {
        Self::new(-12.0, [-9.0, 1.0], [-20.0, 15.0])
    }

    /// Clamp to the soft band. Lower bound first, then upper.
    #[inline]
    pub fn clamp_soft(&self, v: f64) -> f64 {
        let v = if v < self.soft[0] { self.soft[0] } else { v };
        if v > self.soft[1] {
            self.soft[1]
        } else {
            v
        }
    }

    /// Re-centre on an encoder reading.
    ///
    /// The offset is clamped to the hard bounds and the soft bounds become
    /// `offset -/+ SOFT_BAND`, each clamped to its hard bound.
    pub fn recentred(&self, encoder: f64) -> Self {
        let offset = encoder.max(self.hard[0]).min(self.hard[1]);
        let lo = (offset - SOFT_BAND).max(self.hard[0]);
        let hi = (offset + SOFT_BAND).min(self.hard[1]);
        Self {
            offset,
            soft: [lo, hi],
            hard: self.hard,
        }
    }

    /// `true` when `soft` is ordered and nested in `hard`.
    pub fn is_consistent(&self) -> bool {
        self.soft[0] <= self.soft[1]
            && self.hard[0] <= self.soft[0]
            && self.soft[1] <= self.hard[1]
    }
}

/// Limits for both plate axes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlateLimits {
    pub x: AxisLimits,
    pub y: AxisLimits,
}

impl Default for PlateLimits {
    fn default() -> Self {
        Self {
            x: AxisLimits::x_default(),
            y: AxisLimits::y_default(),
        }
    }
}

impl PlateLimits {
    /// `[x_offset, x_soft_min, x_soft_max, y_offset, y_soft_min, y_soft_max]`.
    pub fn offset_report(&self) -> [f64; 6] {
        [
            self.x.offset,
            self.x.soft[0],
            self.x.soft[1],
            self.y.offset,
            self.y.soft[0],
            self.y.soft[1],
        ]
    }
}
