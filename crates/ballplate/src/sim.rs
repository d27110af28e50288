//! In-process collaborators for replay and tests.
//!
//! - [`ReplayFrameSource`]: plays back a fixed list of frame pairs.
//! - [`FixedPose`]/[`StaticEyes`]: constant camera geometry.
//! - [`RecordingActuator`]: accepts every command and records it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use nalgebra::Matrix4;

use crate::collab::{
    Actuator, CameraPose, Frame, FramePair, FrameSource, HeadKinematics, PoseService,
};
use crate::error::DeviceError;

/// Frame source that yields queued pairs once each.
pub struct ReplayFrameSource {
    pairs: VecDeque<FramePair>,
    head_angles: Option<Vec<f64>>,
    remaining: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
    playing: Arc<AtomicBool>,
}

impl ReplayFrameSource {
    pub fn new(pairs: impl IntoIterator<Item = FramePair>) -> Self {
        let pairs: VecDeque<_> = pairs.into_iter().collect();
        Self {
            remaining: Arc::new(AtomicUsize::new(pairs.len())),
            released: Arc::new(AtomicBool::new(false)),
            playing: Arc::new(AtomicBool::new(true)),
            head_angles: None,
            pairs,
        }
    }

    /// Feed each frame to both cameras.
    pub fn mirrored(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self::new(frames.into_iter().map(|f| FramePair {
            left: f.clone(),
            right: f,
        }))
    }

    /// Stream a constant head angle vector alongside the frames.
    pub fn with_head_angles(mut self, angles: Vec<f64>) -> Self {
        self.head_angles = Some(angles);
        self
    }

    /// Shared counter of pairs not yet read.
    pub fn remaining(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.remaining)
    }

    pub fn released(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }

    /// Withhold every pair until the [`play`](Self::play) flag is set.
    pub fn held(self) -> Self {
        self.playing.store(false, Ordering::SeqCst);
        self
    }

    /// Shared flag gating playback; store `true` to start a held source.
    pub fn play(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.playing)
    }
}

impl FrameSource for ReplayFrameSource {
    fn try_read(&mut self) -> Option<FramePair> {
        if !self.playing.load(Ordering::SeqCst) {
            return None;
        }
        let pair = self.pairs.pop_front()?;
        self.remaining.store(self.pairs.len(), Ordering::SeqCst);
        Some(pair)
    }

    fn head_angles(&mut self) -> Option<Vec<f64>> {
        self.head_angles.clone()
    }

    fn release(&mut self) {
        self.pairs.clear();
        self.remaining.store(0, Ordering::SeqCst);
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Pose service that always reports the same pose.
pub struct FixedPose(pub CameraPose);

impl FixedPose {
    pub fn identity() -> Self {
        Self(CameraPose {
            left: Matrix4::identity(),
            right: Matrix4::identity(),
        })
    }
}

impl PoseService for FixedPose {
    fn camera_pose(&mut self) -> Option<CameraPose> {
        Some(self.0)
    }
}

/// Eye kinematics that ignore the joint angles.
#[derive(Clone, Copy, Debug)]
pub struct StaticEyes {
    pub left: Matrix4<f64>,
    pub right: Matrix4<f64>,
}

impl StaticEyes {
    pub fn identity() -> Self {
        Self {
            left: Matrix4::identity(),
            right: Matrix4::identity(),
        }
    }
}

impl HeadKinematics for StaticEyes {
    fn left_eye(&self, _q: &[f64]) -> Option<Matrix4<f64>> {
        Some(self.left)
    }

    fn right_eye(&self, _q: &[f64]) -> Option<Matrix4<f64>> {
        Some(self.right)
    }
}

/// A command received by a [`RecordingActuator`].
#[derive(Clone, Debug, PartialEq)]
pub enum ActuatorCall {
    PositionMove(Vec<f64>),
    ReferenceSpeeds(f64),
    ReferenceAccelerations(f64),
    Release,
}

/// Actuator that records every command and reports fixed encoders.
pub struct RecordingActuator {
    name: String,
    joints: usize,
    encoders: Mutex<Vec<f64>>,
    calls: Mutex<Vec<ActuatorCall>>,
}

impl RecordingActuator {
    pub fn new(name: impl Into<String>, joints: usize) -> Self {
        Self {
            name: name.into(),
            joints,
            encoders: Mutex::new(vec![0.0; joints]),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_encoders(&self, values: Vec<f64>) {
        *lock(&self.encoders) = values;
    }

    pub fn calls(&self) -> Vec<ActuatorCall> {
        lock(&self.calls).clone()
    }

    /// Position commands only, oldest first.
    pub fn moves(&self) -> Vec<Vec<f64>> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                ActuatorCall::PositionMove(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ActuatorCall) {
        log::debug!("{}: {:?}", self.name, call);
        lock(&self.calls).push(call);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Actuator for RecordingActuator {
    fn name(&self) -> &str {
        &self.name
    }

    fn joint_count(&self) -> Result<usize, DeviceError> {
        Ok(self.joints)
    }

    fn encoders(&self) -> Result<Vec<f64>, DeviceError> {
        Ok(lock(&self.encoders).clone())
    }

    fn position_move(&self, setpoints: &[f64]) -> Result<(), DeviceError> {
        if setpoints.len() != self.joints {
            return Err(DeviceError::JointCountMismatch {
                device: self.name.clone(),
                expected: self.joints,
                got: setpoints.len(),
            });
        }
        self.record(ActuatorCall::PositionMove(setpoints.to_vec()));
        Ok(())
    }

    fn set_reference_speeds(&self, speed: f64) -> Result<(), DeviceError> {
        self.record(ActuatorCall::ReferenceSpeeds(speed));
        Ok(())
    }

    fn set_reference_accelerations(&self, acceleration: f64) -> Result<(), DeviceError> {
        self.record(ActuatorCall::ReferenceAccelerations(acceleration));
        Ok(())
    }

    fn release(&self) {
        self.record(ActuatorCall::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(stamp: f64) -> Frame {
        Frame {
            width: 1,
            height: 1,
            data: vec![0; 3],
            stamp,
        }
    }

    #[test]
    fn held_source_yields_nothing_until_played() {
        let mut source = ReplayFrameSource::mirrored([frame(0.0), frame(0.005)]).held();
        let play = source.play();
        assert!(source.try_read().is_none());
        assert_eq!(source.remaining().load(Ordering::SeqCst), 2);

        play.store(true, Ordering::SeqCst);
        assert_eq!(source.try_read().map(|p| p.right.stamp), Some(0.0));
        assert_eq!(source.remaining().load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_drops_pending_pairs() {
        let mut source = ReplayFrameSource::mirrored([frame(0.0)]);
        source.release();
        assert!(source.try_read().is_none());
        assert!(source.released().load(Ordering::SeqCst));
    }
}
