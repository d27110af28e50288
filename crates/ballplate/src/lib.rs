//! Ball-on-plate localization and tilt control.
//!
//! This crate wires the `ballplate-*` crates into a running rig:
//! - collaborator traits for frames, camera pose, eye kinematics and
//!   actuators ([`FrameSource`], [`PoseService`], [`HeadKinematics`],
//!   [`Actuator`])
//! - the per-cycle orchestrator ([`CycleOrchestrator`]) that turns a frame
//!   pair into a platform position and, while control runs, a setpoint
//! - the text command protocol ([`ControlPanel`], [`Command`], [`Reply`])
//! - a tokio [`Runtime`] that ticks the worker and serves commands
//! - (feature `image`) single-image helpers and diagnostic overlays
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::sync::Arc;
//! use ballplate::sim::{FixedPose, RecordingActuator, ReplayFrameSource, StaticEyes};
//! use ballplate::{Collaborators, Runtime, RuntimeConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RuntimeConfig::from_json_file("ballplate.json")?;
//! let runtime = Runtime::start(
//!     config,
//!     Collaborators {
//!         frames: Box::new(ReplayFrameSource::new(Vec::new())),
//!         pose: Some(Box::new(FixedPose::identity())),
//!         kinematics: Arc::new(StaticEyes::identity()),
//!         head: Arc::new(RecordingActuator::new("head", 6)),
//!         arm: Arc::new(RecordingActuator::new("right_arm", 16)),
//!     },
//! )?;
//! let client = runtime.client();
//! println!("{}", client.send("get offset").await?);
//! runtime.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `ballplate::core`: images, masks, homography, platform coordinates.
//! - `ballplate::vision`: segmentation, labeling, correspondence, mapping.
//! - `ballplate::control`: PID, clock, limits, presets, session lifecycle.
//! - `ballplate::sim`: in-process collaborators for replay and tests.

pub use ballplate_control as control;
pub use ballplate_core as core;
pub use ballplate_vision as vision;

mod collab;
mod command;
mod config;
mod cycle;
mod error;
mod pose;
mod runtime;
mod tuning;

pub mod sim;

#[cfg(feature = "image")]
pub mod detect;
#[cfg(feature = "image")]
pub mod overlay;

pub use collab::{
    require_joints, Actuator, CameraPose, Frame, FramePair, FrameSource, HeadKinematics,
    PoseService,
};
pub use command::{Command, CommandParseError, ControlPanel, Gain, Parameter, Query, Reply};
pub use config::{
    CameraIntrinsics, RuntimeConfig, StereoCalibration, StereoExtrinsics, TimingConfig,
};
pub use cycle::{CycleOrchestrator, CycleOutcome, CycleState, PerceptionGap};
pub use error::{CommandError, ConfigError, DeviceError, RuntimeError};
pub use pose::{eye_chain_angles, resolve_pose, rigid_inverse, StereoGeometry, EYE_CHAIN_JOINTS};
pub use runtime::{Collaborators, CommandClient, Runtime, WorkerStats};
pub use tuning::TuningSnapshot;
