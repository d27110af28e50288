//! One perception/control cycle as a pure state transition.
//!
//! [`CycleOrchestrator::run_cycle`] takes the previous [`CycleState`], the
//! current [`TuningSnapshot`], a frame pair and a camera pose, and returns
//! the next state plus a [`CycleOutcome`]. It never touches devices; the
//! worker sends the outcome's setpoints.

use ballplate_control::{control_step, ControlOutput, ControllerState, CycleClock};
use ballplate_core::PlatformPosition;
use ballplate_vision::{PlateDetector, PlateDetectorParams, PlateObservation, VisionError};
use nalgebra::Matrix4;

use crate::collab::{CameraPose, FramePair};
use crate::config::{CameraIntrinsics, RuntimeConfig};
use crate::pose::StereoGeometry;
use crate::tuning::TuningSnapshot;

/// Why a cycle produced no control step.
#[derive(Clone, Debug, PartialEq)]
pub enum PerceptionGap {
    NoFramePair,
    UnsynchronizedPair {
        skew: f64,
    },
    FrameSizeMismatch {
        camera: &'static str,
        width: usize,
        height: usize,
    },
    InvalidFrame(VisionError),
    NoPose,
    InsufficientCorners {
        found: usize,
    },
    /// Four corners were assigned but their homography is singular.
    DegenerateCorners,
    /// The clock is priming or saw a non-increasing stamp.
    NoClock,
}

impl PerceptionGap {
    pub fn kind(&self) -> &'static str {
        match self {
            PerceptionGap::NoFramePair => "no_frame_pair",
            PerceptionGap::UnsynchronizedPair { .. } => "unsynchronized_pair",
            PerceptionGap::FrameSizeMismatch { .. } => "frame_size_mismatch",
            PerceptionGap::InvalidFrame(_) => "invalid_frame",
            PerceptionGap::NoPose => "no_pose",
            PerceptionGap::InsufficientCorners { .. } => "insufficient_corners",
            PerceptionGap::DegenerateCorners => "degenerate_corners",
            PerceptionGap::NoClock => "no_clock",
        }
    }
}

/// State carried by the worker from one cycle to the next.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CycleState {
    pub controller: ControllerState,
    pub clock: CycleClock,
    /// Last mapped platform position, reused when the target is missing.
    pub position: PlatformPosition,
    /// Stop epoch already applied to `controller`.
    pub stop_epoch: u64,
    pub cycles: u64,
}

/// What one cycle saw and did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CycleOutcome {
    pub gap: Option<PerceptionGap>,
    pub dt: Option<f64>,
    /// Left-to-right camera transform at the current pose.
    pub relative_transform: Option<Matrix4<f64>>,
    pub observation: Option<PlateObservation>,
    pub position: Option<PlatformPosition>,
    pub grid_bin: Option<(usize, usize)>,
    /// Present only when control ran this cycle.
    pub control: Option<ControlOutput>,
}

impl CycleOutcome {
    pub fn setpoints(&self) -> Option<&[f64]> {
        self.control.as_ref().map(|c| c.setpoints.as_slice())
    }

    fn with_gap(mut self, gap: PerceptionGap) -> Self {
        log::trace!("cycle skipped: {gap:?}");
        self.gap = Some(gap);
        self
    }
}

/// Fixed per-run context of the cycle.
#[derive(Clone, Debug)]
pub struct CycleOrchestrator {
    geometry: StereoGeometry,
    left: CameraIntrinsics,
    right: CameraIntrinsics,
    vision: PlateDetectorParams,
    max_stamp_skew: f64,
}

impl CycleOrchestrator {
    pub fn new(config: &RuntimeConfig, geometry: StereoGeometry) -> Self {
        Self {
            geometry,
            left: config.calibration.left,
            right: config.calibration.right,
            vision: config.vision,
            max_stamp_skew: config.timing.max_stamp_skew_s,
        }
    }

    /// Run one cycle.
    ///
    /// A stop recorded in `snapshot` since the last cycle resets the control
    /// terms first. The plate is detected in the right frame; the clock runs
    /// on the right frame's stamp for every accepted pair.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(cycle = state.cycles)))]
    pub fn run_cycle(
        &self,
        state: &CycleState,
        snapshot: &TuningSnapshot,
        pair: Option<&FramePair>,
        pose: Option<CameraPose>,
    ) -> (CycleState, CycleOutcome) {
        let mut next = *state;
        next.cycles += 1;
        if snapshot.session.stop_epoch != next.stop_epoch {
            next.controller = next.controller.reset_control();
            next.stop_epoch = snapshot.session.stop_epoch;
            log::debug!("stop observed, control terms reset");
        }
        let mut out = CycleOutcome::default();

        let Some(pair) = pair else {
            return (next, out.with_gap(PerceptionGap::NoFramePair));
        };
        let skew = pair.stamp_skew();
        if skew.is_nan() || skew > self.max_stamp_skew {
            return (next, out.with_gap(PerceptionGap::UnsynchronizedPair { skew }));
        }
        for (camera, frame, intrinsics) in [
            ("left", &pair.left, &self.left),
            ("right", &pair.right, &self.right),
        ] {
            if !intrinsics.matches(frame.width, frame.height) {
                let gap = PerceptionGap::FrameSizeMismatch {
                    camera,
                    width: frame.width,
                    height: frame.height,
                };
                return (next, out.with_gap(gap));
            }
        }

        // The clock advances on every accepted pair, so the first derivative
        // after a detection dropout spans the whole gap over one step.
        out.dt = next.clock.tick(pair.right.stamp);

        let Some(pose) = pose else {
            return (next, out.with_gap(PerceptionGap::NoPose));
        };
        out.relative_transform = Some(self.geometry.relative_transform(&pose));

        let params = PlateDetectorParams {
            thresholds: snapshot.thresholds,
            ..self.vision
        };
        let observation = match PlateDetector::new(params).detect(&pair.right.view(), next.position)
        {
            Ok(obs) => obs,
            Err(e) => return (next, out.with_gap(PerceptionGap::InvalidFrame(e))),
        };
        let found = observation.corners_found();
        let position = observation.position();
        out.observation = Some(observation);

        if found < 4 {
            return (next, out.with_gap(PerceptionGap::InsufficientCorners { found }));
        }
        let Some(position) = position else {
            return (next, out.with_gap(PerceptionGap::DegenerateCorners));
        };
        next.position = position;
        out.position = Some(position);
        out.grid_bin = Some(position.grid_bin());

        let Some(dt) = out.dt else {
            return (next, out.with_gap(PerceptionGap::NoClock));
        };

        if snapshot.session.control_running {
            let (controller, control) = control_step(
                &next.controller,
                &position,
                dt,
                &snapshot.gains,
                &snapshot.limits,
            );
            next.controller = controller;
            out.control = Some(control);
        } else {
            next.controller = next.controller.observe(&position, dt);
        }
        (next, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::Frame;
    use crate::config::{StereoCalibration, StereoExtrinsics};
    use crate::sim::StaticEyes;

    const W: usize = 64;
    const H: usize = 48;

    fn config() -> RuntimeConfig {
        let cam = CameraIntrinsics {
            fx: 100.0,
            fy: 100.0,
            cx: 32.0,
            cy: 24.0,
            w: W,
            h: H,
        };
        RuntimeConfig::new(StereoCalibration {
            left: cam,
            right: cam,
            extrinsics: StereoExtrinsics {
                ql: vec![0.0; 8],
                qr: vec![0.0; 8],
                ..StereoExtrinsics::default()
            },
        })
    }

    fn orchestrator() -> CycleOrchestrator {
        let config = config();
        let geometry =
            StereoGeometry::new(&config.calibration.extrinsics, &StaticEyes::identity()).unwrap();
        CycleOrchestrator::new(&config, geometry)
    }

    fn pair(w: usize, h: usize, left_stamp: f64, right_stamp: f64) -> FramePair {
        let frame = |stamp| Frame {
            width: w,
            height: h,
            data: vec![0; w * h * 3],
            stamp,
        };
        FramePair {
            left: frame(left_stamp),
            right: frame(right_stamp),
        }
    }

    fn identity_pose() -> Option<CameraPose> {
        Some(CameraPose {
            left: Matrix4::identity(),
            right: Matrix4::identity(),
        })
    }

    fn snapshot() -> TuningSnapshot {
        TuningSnapshot::from_config(&config())
    }

    #[test]
    fn missing_pair_is_a_gap() {
        let orch = orchestrator();
        let (next, out) = orch.run_cycle(&CycleState::default(), &snapshot(), None, None);
        assert_eq!(out.gap, Some(PerceptionGap::NoFramePair));
        assert_eq!(next.cycles, 1);
        assert_eq!(next.clock, CycleClock::default());
    }

    #[test]
    fn skewed_pair_is_rejected_before_the_clock() {
        let orch = orchestrator();
        let p = pair(W, H, 1.0, 1.2);
        let (next, out) = orch.run_cycle(&CycleState::default(), &snapshot(), Some(&p), identity_pose());
        assert!(matches!(out.gap, Some(PerceptionGap::UnsynchronizedPair { .. })));
        assert_eq!(next.clock.last_stamp(), None);
    }

    #[test]
    fn wrong_frame_size_is_rejected() {
        let orch = orchestrator();
        let p = pair(W + 1, H, 1.0, 1.0);
        let (_, out) = orch.run_cycle(&CycleState::default(), &snapshot(), Some(&p), identity_pose());
        assert_eq!(
            out.gap,
            Some(PerceptionGap::FrameSizeMismatch {
                camera: "left",
                width: W + 1,
                height: H
            })
        );
    }

    #[test]
    fn missing_pose_still_advances_clock() {
        let orch = orchestrator();
        let p = pair(W, H, 2.0, 2.0);
        let (next, out) = orch.run_cycle(&CycleState::default(), &snapshot(), Some(&p), None);
        assert_eq!(out.gap, Some(PerceptionGap::NoPose));
        assert_eq!(next.clock.last_stamp(), Some(2.0));
    }

    #[test]
    fn blank_frame_has_no_corners() {
        let orch = orchestrator();
        let p = pair(W, H, 2.0, 2.0);
        let state = CycleState::default();
        let (next, out) = orch.run_cycle(&state, &snapshot(), Some(&p), identity_pose());
        assert_eq!(out.gap, Some(PerceptionGap::InsufficientCorners { found: 0 }));
        assert_eq!(next.controller, state.controller);
        assert!(out.setpoints().is_none());
        assert_eq!(out.relative_transform, Some(Matrix4::identity()));
    }

    #[test]
    fn stop_epoch_resets_control_once() {
        let orch = orchestrator();
        let mut state = CycleState::default();
        state.controller.x.integral = 3.0;
        state.controller.x.position = 7.0;
        let mut snap = snapshot();
        snap.session.stop_epoch = 1;

        let (next, _) = orch.run_cycle(&state, &snap, None, None);
        assert_eq!(next.controller.x.integral, 0.0);
        assert_eq!(next.controller.x.position, 7.0);
        assert_eq!(next.stop_epoch, 1);

        let mut again = next;
        again.controller.x.integral = 1.0;
        let (after, _) = orch.run_cycle(&again, &snap, None, None);
        assert_eq!(after.controller.x.integral, 1.0);
    }
}
