//! Camera pose resolution and the stereo relative transform.

use nalgebra::{Matrix3, Matrix4, Vector3};

use crate::collab::{CameraPose, HeadKinematics, PoseService};
use crate::config::StereoExtrinsics;
use crate::error::ConfigError;

/// Eye chain joints: three torso joints plus five neck/eye joints.
pub const EYE_CHAIN_JOINTS: usize = 8;

/// Inverse of a rigid transform `[R t; 0 1]`.
pub fn rigid_inverse(m: &Matrix4<f64>) -> Matrix4<f64> {
    let r: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
    let t: Vector3<f64> = m.fixed_view::<3, 1>(0, 3).into_owned();
    let rt = r.transpose();
    let mut out = Matrix4::identity();
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(&rt);
    out.fixed_view_mut::<3, 1>(0, 3).copy_from(&(-rt * t));
    out
}

/// Eye chain angles (radians) for both eyes from raw head encoder readings.
///
/// `head` holds at least six values in degrees: neck pitch/roll/yaw, eye
/// tilt, version and vergence. The torso is assumed at home. The left eye
/// sees `version + vergence / 2`, the right eye `version - vergence / 2`.
pub fn eye_chain_angles(
    head: &[f64],
) -> Option<([f64; EYE_CHAIN_JOINTS], [f64; EYE_CHAIN_JOINTS])> {
    if head.len() < 6 || head[..6].iter().any(|v| !v.is_finite()) {
        return None;
    }
    let mut left = [0.0; EYE_CHAIN_JOINTS];
    left[3..7].copy_from_slice(&head[..4]);
    let mut right = left;
    left[7] = head[4] + head[5] / 2.0;
    right[7] = head[4] - head[5] / 2.0;
    Some((left.map(f64::to_radians), right.map(f64::to_radians)))
}

/// Camera pose from the pose service, else from head angles through the
/// eye kinematics. `None` means the cycle has no usable pose.
pub fn resolve_pose(
    service: Option<&mut (dyn PoseService + '_)>,
    head_angles: Option<&[f64]>,
    kinematics: &dyn HeadKinematics,
) -> Option<CameraPose> {
    if let Some(pose) = service.and_then(|s| s.camera_pose()) {
        return Some(pose);
    }
    let (ql, qr) = eye_chain_angles(head_angles?)?;
    Some(CameraPose {
        left: kinematics.left_eye(&ql)?,
        right: kinematics.right_eye(&qr)?,
    })
}

/// Stereo geometry fixed at startup: eye transforms at the calibration
/// angles and the calibrated left-to-right baseline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StereoGeometry {
    left_ref: Matrix4<f64>,
    right_ref: Matrix4<f64>,
    baseline: Matrix4<f64>,
}

impl StereoGeometry {
    pub fn new(
        extrinsics: &StereoExtrinsics,
        kinematics: &dyn HeadKinematics,
    ) -> Result<Self, ConfigError> {
        let baseline = extrinsics.baseline()?;
        let left_ref = kinematics.left_eye(&extrinsics.ql).ok_or_else(|| {
            ConfigError::InvalidCalibration(format!(
                "left eye kinematics rejected QL ({} values)",
                extrinsics.ql.len()
            ))
        })?;
        let right_ref = kinematics.right_eye(&extrinsics.qr).ok_or_else(|| {
            ConfigError::InvalidCalibration(format!(
                "right eye kinematics rejected QR ({} values)",
                extrinsics.qr.len()
            ))
        })?;
        Ok(Self {
            left_ref,
            right_ref,
            baseline,
        })
    }

    /// Left-to-right camera transform at `pose`.
    ///
    /// Equals the calibrated baseline when both eyes sit at their reference
    /// pose.
    pub fn relative_transform(&self, pose: &CameraPose) -> Matrix4<f64> {
        let left_motion = rigid_inverse(&pose.left) * self.left_ref;
        rigid_inverse(&pose.right) * self.right_ref * self.baseline * rigid_inverse(&left_motion)
    }
}
