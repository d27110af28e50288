//! Plate tilt control.
//!
//! - [`control_step`]: filtered two-axis PID from platform position to the
//!   two tilt joint signals, soft-limited per axis.
//! - [`CycleClock`]: two-sample smoothed time step.
//! - [`AxisLimits`]/[`PlateLimits`]: offsets, soft and hard bounds, offset
//!   recompute from encoders.
//! - [`preset_plan`]/[`PlanCursor`]: fixed poses as timed waypoint plans.
//! - [`Session`]: lifecycle guards for presets and start/stop.

mod clock;
mod controller;
mod error;
mod lifecycle;
mod limits;
mod pid;
mod presets;

pub use clock::CycleClock;
pub use controller::{control_step, ControlOutput, ControllerState};
pub use error::LifecycleError;
pub use lifecycle::{LifecycleCommand, Session, SessionStage};
pub use limits::{AxisLimits, PlateLimits, SOFT_BAND};
pub use pid::{filter_coefficients, step_axis, AxisState, AxisStep, PidGains};
pub use presets::{
    arm_rest_pose, control_pose, preset_plan, Limb, MotionPlan, PlanCursor, Preset, Waypoint,
    ARM_JOINTS, ARM_JOINT_X, ARM_JOINT_Y, CONTROL_REF_SPEED, HEAD_JOINTS, HEAD_POSE,
    PRESET_REF_SPEED,
};
