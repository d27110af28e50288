//! Seams to the outside world: cameras, head pose, eye kinematics and joint
//! actuators.
//!
//! The worker owns the frame source and pose service. Actuators are shared
//! between the worker (position moves) and the command handler (encoder
//! reads, reference speeds), so their methods take `&self`.

use ballplate_core::RgbImageView;
use nalgebra::Matrix4;

use crate::error::DeviceError;

/// One RGB frame with its capture timestamp in seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    /// Packed RGB8, row-major.
    pub data: Vec<u8>,
    pub stamp: f64,
}

impl Frame {
    pub fn view(&self) -> RgbImageView<'_> {
        RgbImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

/// Left and right frames read together.
#[derive(Clone, Debug, PartialEq)]
pub struct FramePair {
    pub left: Frame,
    pub right: Frame,
}

impl FramePair {
    pub fn stamp_skew(&self) -> f64 {
        (self.left.stamp - self.right.stamp).abs()
    }
}

/// Homogeneous root-to-eye transforms of both cameras.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub left: Matrix4<f64>,
    pub right: Matrix4<f64>,
}

/// Non-blocking stereo frame source.
pub trait FrameSource: Send {
    /// Return a pair when both cameras have a pending frame.
    fn try_read(&mut self) -> Option<FramePair>;

    /// Latest head joint angles in degrees, if the source streams them.
    fn head_angles(&mut self) -> Option<Vec<f64>> {
        None
    }

    fn release(&mut self) {}
}

/// Direct camera pose query, typically backed by a gaze controller.
pub trait PoseService: Send {
    fn camera_pose(&mut self) -> Option<CameraPose>;
}

/// Forward kinematics of the two eye chains.
///
/// `q` holds eight joint angles in radians: three torso joints followed by
/// the neck and eye joints of the chain.
pub trait HeadKinematics: Send + Sync {
    fn left_eye(&self, q: &[f64]) -> Option<Matrix4<f64>>;
    fn right_eye(&self, q: &[f64]) -> Option<Matrix4<f64>>;
}

/// A position-controlled joint group.
pub trait Actuator: Send + Sync {
    fn name(&self) -> &str;
    fn joint_count(&self) -> Result<usize, DeviceError>;
    fn encoders(&self) -> Result<Vec<f64>, DeviceError>;
    /// Command every joint to an absolute position in degrees.
    fn position_move(&self, setpoints: &[f64]) -> Result<(), DeviceError>;
    /// Set the same reference speed (deg/s) on every joint.
    fn set_reference_speeds(&self, speed: f64) -> Result<(), DeviceError>;
    fn set_reference_accelerations(&self, acceleration: f64) -> Result<(), DeviceError>;
    fn release(&self) {}
}

/// Check that `actuator` exposes exactly `expected` joints.
pub fn require_joints(actuator: &dyn Actuator, expected: usize) -> Result<(), DeviceError> {
    let got = actuator.joint_count()?;
    if got != expected {
        return Err(DeviceError::JointCountMismatch {
            device: actuator.name().to_string(),
            expected,
            got,
        });
    }
    Ok(())
}
