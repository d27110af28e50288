//! Runtime configuration loaded from JSON.
//!
//! The file mirrors the rig's resource groups: one intrinsics block per
//! camera, a `stereo_disparity` block with the head encoder references and
//! the baseline transform, and optional tuning sections that fall back to
//! the built-in defaults.
//!
//! ```json
//! {
//!   "camera_calibration_left":  { "fx": 225.0, "fy": 225.0, "cx": 160.0, "cy": 120.0, "w": 320, "h": 240 },
//!   "camera_calibration_right": { "fx": 225.0, "fy": 225.0, "cx": 160.0, "cy": 120.0, "w": 320, "h": 240 },
//!   "stereo_disparity": { "QL": [0, 0, 0, 0, 0, 0, 0, 0], "QR": [0, 0, 0, 0, 0, 0, 0, 0] },
//!   "gains": { "kp": 0.0015 }
//! }
//! ```

use std::fs;
use std::path::Path;

use ballplate_control::{PidGains, PlateLimits};
use ballplate_vision::PlateDetectorParams;
use nalgebra::{Matrix3, Matrix4};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Pinhole intrinsics and the image size they were calibrated for.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub w: usize,
    pub h: usize,
}

impl CameraIntrinsics {
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    /// `true` when a frame of `width` x `height` was taken at the calibrated size.
    pub fn matches(&self, width: usize, height: usize) -> bool {
        self.w == width && self.h == height
    }

    fn validate(&self, camera: &str) -> Result<(), ConfigError> {
        let finite = [self.fx, self.fy, self.cx, self.cy]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(ConfigError::InvalidCalibration(format!(
                "{camera} camera focal lengths must be positive and finite"
            )));
        }
        if self.w == 0 || self.h == 0 {
            return Err(ConfigError::InvalidCalibration(format!(
                "{camera} camera size is {}x{}",
                self.w, self.h
            )));
        }
        Ok(())
    }
}

/// Head encoder references and baseline transform of the stereo pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StereoExtrinsics {
    /// Eye-chain joint angles (radians) at which `HN` was calibrated, left eye.
    #[serde(rename = "QL", default)]
    pub ql: Vec<f64>,
    #[serde(rename = "QR", default)]
    pub qr: Vec<f64>,
    /// Row-major 4x4 left-to-right transform at the reference angles.
    #[serde(rename = "HN", default = "identity_row_major")]
    pub hn: Vec<f64>,
}

impl Default for StereoExtrinsics {
    fn default() -> Self {
        Self {
            ql: Vec::new(),
            qr: Vec::new(),
            hn: identity_row_major(),
        }
    }
}

fn identity_row_major() -> Vec<f64> {
    Matrix4::<f64>::identity().transpose().iter().copied().collect()
}

impl StereoExtrinsics {
    /// `HN` as a matrix.
    pub fn baseline(&self) -> Result<Matrix4<f64>, ConfigError> {
        if self.hn.len() != 16 {
            return Err(ConfigError::InvalidCalibration(format!(
                "HN needs 16 values, got {}",
                self.hn.len()
            )));
        }
        if self.hn.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidCalibration(
                "HN contains non-finite values".into(),
            ));
        }
        Ok(Matrix4::from_row_slice(&self.hn))
    }
}

/// Both cameras plus the stereo extrinsics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StereoCalibration {
    pub left: CameraIntrinsics,
    pub right: CameraIntrinsics,
    pub extrinsics: StereoExtrinsics,
}

/// Worker loop timing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Worker tick period in milliseconds.
    pub tick_period_ms: u64,
    /// Largest accepted |left stamp - right stamp|, seconds.
    pub max_stamp_skew_s: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 5,
            max_stamp_skew_s: 0.05,
        }
    }
}

#[derive(Deserialize)]
struct RuntimeConfigFile {
    #[serde(default = "default_name")]
    name: String,
    camera_calibration_left: Option<CameraIntrinsics>,
    camera_calibration_right: Option<CameraIntrinsics>,
    #[serde(default)]
    stereo_disparity: StereoExtrinsics,
    #[serde(default)]
    vision: PlateDetectorParams,
    #[serde(default)]
    gains: PidGains,
    #[serde(default)]
    limits: PlateLimits,
    #[serde(default)]
    timing: TimingConfig,
}

fn default_name() -> String {
    "ballplate".to_string()
}

#[derive(Deserialize)]
struct VisionSection {
    #[serde(default)]
    vision: PlateDetectorParams,
}

/// Everything the runtime needs at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeConfig {
    /// Instance name used as the log prefix.
    pub name: String,
    pub calibration: StereoCalibration,
    pub vision: PlateDetectorParams,
    pub gains: PidGains,
    pub limits: PlateLimits,
    pub timing: TimingConfig,
}

impl RuntimeConfig {
    /// Config with the given calibration and default tuning.
    pub fn new(calibration: StereoCalibration) -> Self {
        Self {
            name: default_name(),
            calibration,
            vision: PlateDetectorParams::default(),
            gains: PidGains::default(),
            limits: PlateLimits::default(),
            timing: TimingConfig::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let file: RuntimeConfigFile = serde_json::from_str(json)?;
        let left = file
            .camera_calibration_left
            .ok_or(ConfigError::MissingCalibration { camera: "left" })?;
        let right = file
            .camera_calibration_right
            .ok_or(ConfigError::MissingCalibration { camera: "right" })?;
        let config = Self {
            name: file.name,
            calibration: StereoCalibration {
                left,
                right,
                extrinsics: file.stereo_disparity,
            },
            vision: file.vision,
            gains: file.gains,
            limits: file.limits,
            timing: file.timing,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&read_file(path.as_ref())?)
    }

    /// Read only the `vision` section of a config file; calibration may be absent.
    pub fn vision_params_from_json_file(
        path: impl AsRef<Path>,
    ) -> Result<PlateDetectorParams, ConfigError> {
        let section: VisionSection = serde_json::from_str(&read_file(path.as_ref())?)?;
        Ok(section.vision)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.calibration.left.validate("left")?;
        self.calibration.right.validate("right")?;
        self.calibration.extrinsics.baseline()?;

        let g = &self.gains;
        if ![g.kp, g.kd, g.ki, g.w_b].iter().all(|v| v.is_finite()) {
            return Err(ConfigError::InvalidParameter(
                "gains must be finite".into(),
            ));
        }
        if g.w_b <= 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "filter bandwidth w_b must be positive, got {}",
                g.w_b
            )));
        }
        for (axis, limits) in [("x", &self.limits.x), ("y", &self.limits.y)] {
            if !limits.is_consistent() {
                return Err(ConfigError::InvalidParameter(format!(
                    "{axis} soft limits {:?} must be ordered and inside hard limits {:?}",
                    limits.soft, limits.hard
                )));
            }
        }
        if self.timing.tick_period_ms == 0 {
            return Err(ConfigError::InvalidParameter(
                "tick_period_ms must be positive".into(),
            ));
        }
        let skew = self.timing.max_stamp_skew_s;
        if !skew.is_finite() || skew < 0.0 {
            return Err(ConfigError::InvalidParameter(
                "max_stamp_skew_s must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
