//! Two-axis plate controller.
//!
//! The controller is a pure function of its inputs: every call takes the
//! previous [`ControllerState`] by reference and returns the next one, so a
//! skipped cycle is simply a call that never happened.

use ballplate_core::PlatformPosition;
use serde::{Deserialize, Serialize};

use crate::limits::PlateLimits;
use crate::pid::{step_axis, AxisState, AxisStep, PidGains};
use crate::presets::control_pose;

/// State carried across cycles for both axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    pub x: AxisState,
    pub y: AxisState,
}

impl ControllerState {
    /// Update only the measurement baseline (control inactive).
    pub fn observe(&self, position: &PlatformPosition, dt: f64) -> Self {
        Self {
            x: self.x.observe(position.x, dt),
            y: self.y.observe(position.y, dt),
        }
    }

    /// State after a stop: control terms zeroed, last measurement kept.
    pub fn reset_control(&self) -> Self {
        Self {
            x: self.x.reset_control(),
            y: self.y.reset_control(),
        }
    }
}

/// What one active control step produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlOutput {
    pub x: AxisStep,
    pub y: AxisStep,
    /// Full arm setpoint vector with both axis signals in place.
    pub setpoints: Vec<f64>,
}

/// Run one active control step.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all, fields(dt = dt)))]
pub fn control_step(
    state: &ControllerState,
    position: &PlatformPosition,
    dt: f64,
    gains: &PidGains,
    limits: &PlateLimits,
) -> (ControllerState, ControlOutput) {
    let x = step_axis(&state.x, position.x, dt, gains, &limits.x);
    let y = step_axis(&state.y, position.y, dt, gains, &limits.y);

    log::debug!(
        "control p=({:.2}, {:.2}) u_f=({:.5}, {:.5}) signal=({:.3}, {:.3})",
        position.x,
        position.y,
        x.state.filtered,
        y.state.filtered,
        x.signal,
        y.signal
    );

    let next = ControllerState {
        x: x.state,
        y: y.state,
    };
    let setpoints = control_pose(x.signal, y.signal).to_vec();
    (next, ControlOutput { x, y, setpoints })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{ARM_JOINT_X, ARM_JOINT_Y};

    #[test]
    fn identical_inputs_give_identical_outputs() {
        let gains = PidGains::default();
        let limits = PlateLimits::default();
        let state = ControllerState {
            x: AxisState {
                position: 3.0,
                derivative: -1.0,
                integral: 0.2,
                filtered: 0.01,
                raw: 0.02,
            },
            y: AxisState::default(),
        };
        let p = PlatformPosition::new(5.0, -8.0, true);
        let a = control_step(&state, &p, 0.005, &gains, &limits);
        let b = control_step(&state, &p, 0.005, &gains, &limits);
        assert_eq!(a, b);
        assert_eq!(a.0.x.filtered.to_bits(), b.0.x.filtered.to_bits());
    }

    #[test]
    fn axis_signals_land_on_their_joints() {
        let (_, out) = control_step(
            &ControllerState::default(),
            &PlatformPosition::new(0.0, 0.0, true),
            0.01,
            &PidGains::default(),
            &PlateLimits::default(),
        );
        assert_eq!(out.setpoints.len(), 16);
        assert_eq!(out.setpoints[ARM_JOINT_X], 4.0);
        // y offset -12 sits below the soft band
        assert_eq!(out.setpoints[ARM_JOINT_Y], -9.0);
    }

    #[test]
    fn soft_limits_contain_every_signal() {
        let gains = PidGains {
            kp: 0.05,
            kd: 0.01,
            ki: 0.01,
            w_b: 8.0,
        };
        let limits = PlateLimits::default();
        let mut state = ControllerState::default();
        let path = [64.0, -64.0, 30.0, -10.0, 0.0, 64.0, 64.0, -64.0];
        for (i, &v) in path.iter().cycle().take(200).enumerate() {
            let p = PlatformPosition::new(v, -v, true);
            let dt = 0.003 + (i % 5) as f64 * 0.001;
            let (next, out) = control_step(&state, &p, dt, &gains, &limits);
            assert!(out.x.signal >= limits.x.soft[0] && out.x.signal <= limits.x.soft[1]);
            assert!(out.y.signal >= limits.y.soft[0] && out.y.signal <= limits.y.soft[1]);
            state = next;
        }
    }

    #[test]
    fn reset_keeps_baseline() {
        let (state, _) = control_step(
            &ControllerState::default(),
            &PlatformPosition::new(10.0, 20.0, true),
            0.01,
            &PidGains::default(),
            &PlateLimits::default(),
        );
        let r = state.reset_control();
        assert_eq!(r.x.position, 10.0);
        assert_eq!(r.y.position, 20.0);
        assert_eq!(r.x.integral, 0.0);
        assert_eq!(r.y.filtered, 0.0);
        assert_eq!(r.y.raw, 0.0);
    }
}
