//! Discretized PID with a single-pole low-pass on the output.

use serde::{Deserialize, Serialize};

use crate::limits::AxisLimits;

/// Gains shared by both plate axes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidGains {
    pub kp: f64,
    pub kd: f64,
    pub ki: f64,
    /// Output filter bandwidth, rad/s.
    pub w_b: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 0.0015,
            kd: 0.001,
            ki: 0.0002,
            w_b: 4.0,
        }
    }
}

/// Per-axis memory carried from one cycle to the next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisState {
    /// Last measured position.
    pub position: f64,
    /// Last derivative estimate.
    pub derivative: f64,
    pub integral: f64,
    /// Last filtered output, radians.
    pub filtered: f64,
    /// Last unfiltered output, radians.
    pub raw: f64,
}

impl AxisState {
    /// Move the measurement baseline without touching the control terms.
    pub fn observe(&self, p: f64, dt: f64) -> Self {
        Self {
            position: p,
            derivative: (p - self.position) / dt,
            ..*self
        }
    }

    /// Zero the integral and both outputs, keep the measurement baseline.
    pub fn reset_control(&self) -> Self {
        Self {
            integral: 0.0,
            filtered: 0.0,
            raw: 0.0,
            ..*self
        }
    }
}

/// One axis update: new state plus the soft-limited joint signal in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisStep {
    pub state: AxisState,
    /// `offset + filtered * 180/pi` before soft limiting.
    pub unclamped: f64,
    pub signal: f64,
}

/// Low-pass coefficients `(alpha, beta)` for a step of `dt` seconds.
#[inline]
pub fn filter_coefficients(dt: f64, w_b: f64) -> (f64, f64) {
    let a = dt * w_b;
    (a / (2.0 + a), (2.0 - a) / (2.0 + a))
}

/// Advance one axis by `dt` seconds with measurement `p`.
///
/// `dt` must be positive; the caller skips the step otherwise.
pub fn step_axis(
    state: &AxisState,
    p: f64,
    dt: f64,
    gains: &PidGains,
    limits: &AxisLimits,
) -> AxisStep {
    let derivative = (p - state.position) / dt;
    let integral = state.integral + p * dt;
    let raw = gains.kp * p + gains.kd * derivative + gains.ki * integral;

    let (alpha, beta) = filter_coefficients(dt, gains.w_b);
    let filtered = alpha * (raw + state.raw) + beta * state.filtered;

    let unclamped = limits.offset + filtered.to_degrees();
    let signal = limits.clamp_soft(unclamped);

    AxisStep {
        state: AxisState {
            position: p,
            derivative,
            integral,
            filtered,
            raw,
        },
        unclamped,
        signal,
    }
}
